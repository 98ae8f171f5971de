//! TUNA Platform - source and sink drivers
//!
//! This crate provides the concrete I/O at the edges of the pipeline:
//! - Producers: a sound-file decoder (`hound`), a live capture device
//!   (`cpal` bridged through an `rtrb` ring buffer), and a zero-sample
//!   generator for benchmarking.
//! - Sinks: CSV, a framed binary DAT format, and a null sink.
//! - A rotating WAV recorder that itself implements `Consumer`.
//!
//! None of `tuna_core`'s pipeline stages depend on this crate; they only
//! depend on the `Producer`/`Consumer`/`Sink` contracts it implements.

mod capture;
mod csv_sink;
mod dat_sink;
mod error;
mod null_sink;
mod recorder;
mod sndfile;
mod zero;

pub use capture::CaptureProducer;
pub use csv_sink::CsvSink;
pub use dat_sink::{DatRecordKind, DatSink};
pub use error::PlatformError;
pub use null_sink::NullSink;
pub use recorder::Recorder;
pub use sndfile::SndFileProducer;
pub use zero::ZeroProducer;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        let _sink = NullSink;
    }
}
