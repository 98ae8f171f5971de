//! TUNA Core - real-time underwater-acoustic analysis pipeline
//!
//! This crate provides:
//! - Reference-counted sample buffers shared across pipeline stages
//! - A retention list (`BufferHold`) for replaying pre-onset history
//! - Producer/Consumer stage contracts and a cross-thread delivery queue
//! - The two analysis stages: half-second time-slice spectra and
//!   threshold-triggered pulse detection
//! - A sink contract abstracting the concrete record encoding
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   Buffer    ┌────────────────┐   Buffer   ┌───────────────┐
//! │ Producer │ ──────────▶ │ CrossThreadQueue│ ─────────▶ │ TimeSlice /   │
//! │ (capture │             │  (worker thread) │            │ Pulse        │
//! │  thread) │             └────────────────┘            │ (Consumer)    │
//! └──────────┘                                            └──────┬────────┘
//!                                                                  │ Sink
//!                                                                  ▼
//!                                                           CSV / binary
//! ```
//!
//! None of these types know which platform backend produced the samples or
//! which encoding a `Sink` writes to; those live in `tuna_platform`.

mod buffer;
mod bufhold;
mod error;
mod pipeline;
mod pulse;
mod queue;
mod sink;
mod time_slice;
mod timestamp;

pub use buffer::{Buffer, Sample, SAMPLE_MAX, SAMPLE_MIN};
pub use bufhold::{Advance, BufferHold, Handle};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{Consumer, Producer, StopCondition};
pub use pulse::{Pulse, PulseParams};
pub use queue::CrossThreadQueue;
pub use sink::Sink;
pub use time_slice::TimeSlice;
pub use timestamp::Timestamp;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        let _buf = Buffer::acquire(4);
        let _hold = BufferHold::new();
        let _ts = Timestamp::ZERO;
    }
}
