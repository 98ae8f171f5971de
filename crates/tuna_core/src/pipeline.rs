//! Producer/Consumer capability contracts
//!
//! These traits replace the original's function-pointer capability tables.
//! Each pipeline stage is a concrete `Consumer`; a stage that also drives
//! acquisition from an external source additionally implements `Producer`.
//! There is deliberately no shared base trait or inheritance between
//! stages — each variant composes the contracts it needs.

use crate::buffer::Buffer;
use crate::error::PipelineResult;
use crate::timestamp::Timestamp;

/// Why a [`Producer::run`] call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    /// The source ran out of data on its own (end of file, device closed).
    Eof,
    /// `stop()` was called while `run()` was executing.
    Requested,
}

/// Drives acquisition from an external source and feeds a downstream
/// [`Consumer`].
pub trait Producer: Send {
    /// Run until the source is exhausted or `stop` is called. Blocking.
    fn run(&mut self) -> PipelineResult<StopCondition>;

    /// Request that an in-progress or future `run()` return as soon as
    /// possible. Safe to call from another thread; idempotent.
    fn stop(&self);
}

/// Receives samples and stream-lifecycle events from upstream.
///
/// Call order is always `start` exactly once, then any number of
/// interleaved `write`/`resync` calls, then `exit` exactly once; no method
/// is called again after `exit`.
pub trait Consumer: Send {
    /// Must precede any `write`. Declares the sample rate for the stream
    /// that follows and the wall-clock time at which it starts.
    fn start(&mut self, sample_rate: u32, ts: Timestamp) -> PipelineResult<()>;

    /// Deliver `count` fresh samples owned by `buf`. Ownership is
    /// transferred logically: a `Consumer` that wants to retain the data
    /// past this call must `buf.clone()` it (incrementing the refcount)
    /// before returning.
    fn write(&mut self, buf: Buffer, count: usize) -> PipelineResult<()>;

    /// Announces a discontinuity in the stream. Downstream stages may
    /// discard any partially-accumulated state; retained buffers should be
    /// released since they predate the gap.
    fn resync(&mut self, ts: Timestamp) -> PipelineResult<()>;

    /// Release all resources owned by this consumer. Called exactly once,
    /// after the last `write`/`resync`.
    fn exit(&mut self) -> PipelineResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        events: Vec<String>,
    }

    impl Consumer for Recorder {
        fn start(&mut self, sample_rate: u32, ts: Timestamp) -> PipelineResult<()> {
            self.events.push(format!("start({sample_rate},{ts})"));
            Ok(())
        }

        fn write(&mut self, buf: Buffer, count: usize) -> PipelineResult<()> {
            self.events.push(format!("write({},{count})", buf.len()));
            Ok(())
        }

        fn resync(&mut self, ts: Timestamp) -> PipelineResult<()> {
            self.events.push(format!("resync({ts})"));
            Ok(())
        }

        fn exit(&mut self) -> PipelineResult<()> {
            self.events.push("exit".into());
            Ok(())
        }
    }

    #[test]
    fn consumer_trait_object_is_object_safe_and_callable() {
        let mut rec = Recorder { events: vec![] };
        let consumer: &mut dyn Consumer = &mut rec;
        consumer.start(8192, Timestamp::ZERO).unwrap();
        consumer
            .write(Buffer::acquire(4), 4)
            .unwrap();
        consumer.resync(Timestamp::ZERO).unwrap();
        consumer.exit().unwrap();
        assert_eq!(rec.events.len(), 4);
    }
}
