//! Null sink: discards every record. Used for benchmarking the analysis
//! stages without I/O overhead, and by `--output null`.

use std::io;

use tuna_core::{Sample, Sink, Timestamp};

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn write_start(&mut self, _ts: Timestamp) -> io::Result<()> {
        Ok(())
    }

    fn write_resync(&mut self, _ts: Timestamp) -> io::Result<()> {
        Ok(())
    }

    fn write_field_sample(&mut self, _v: Sample) {}

    fn write_field_uint(&mut self, _v: u32) {}

    fn write_field_float(&mut self, _v: f32) {}

    fn end_record(&mut self) -> io::Result<()> {
        Ok(())
    }
}
