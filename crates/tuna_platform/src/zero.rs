//! Zero-sample producer: feeds silence at a fixed rate, useful for
//! benchmarking the pipeline without real I/O.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tuna_core::{Buffer, Consumer, PipelineResult, Producer, StopCondition, Timestamp};

pub struct ZeroProducer {
    downstream: Box<dyn Consumer>,
    sample_rate: u32,
    chunk: usize,
    total_samples: usize,
    stop: Arc<AtomicBool>,
}

impl ZeroProducer {
    pub fn new(downstream: Box<dyn Consumer>, sample_rate: u32, total_samples: usize) -> Self {
        ZeroProducer {
            downstream,
            sample_rate,
            chunk: 4096,
            total_samples,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A cloneable handle a caller can use to request a stop from another
    /// thread without needing `&self`/`&mut self` access to the producer
    /// itself (which `run()` holds exclusively while it blocks).
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }
}

impl Producer for ZeroProducer {
    fn run(&mut self) -> PipelineResult<StopCondition> {
        self.downstream.start(self.sample_rate, Timestamp::ZERO)?;

        let mut produced = 0usize;
        while produced < self.total_samples {
            if self.stop.load(Ordering::Acquire) {
                self.downstream.exit()?;
                return Ok(StopCondition::Requested);
            }
            let n = self.chunk.min(self.total_samples - produced);
            let buf = Buffer::acquire(n);
            self.downstream.write(buf, n)?;
            produced += n;
        }

        self.downstream.exit()?;
        Ok(StopCondition::Eof)
    }

    fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingConsumer {
        total: Arc<Mutex<usize>>,
        started: Arc<Mutex<bool>>,
    }

    impl Consumer for CountingConsumer {
        fn start(&mut self, _sample_rate: u32, _ts: Timestamp) -> PipelineResult<()> {
            *self.started.lock().unwrap() = true;
            Ok(())
        }
        fn write(&mut self, buf: Buffer, count: usize) -> PipelineResult<()> {
            assert_eq!(buf.len(), count);
            *self.total.lock().unwrap() += count;
            Ok(())
        }
        fn resync(&mut self, _ts: Timestamp) -> PipelineResult<()> {
            Ok(())
        }
        fn exit(&mut self) -> PipelineResult<()> {
            Ok(())
        }
    }

    #[test]
    fn produces_exactly_the_requested_sample_count() {
        let total = Arc::new(Mutex::new(0));
        let started = Arc::new(Mutex::new(false));
        let consumer = CountingConsumer {
            total: Arc::clone(&total),
            started: Arc::clone(&started),
        };
        let mut producer = ZeroProducer::new(Box::new(consumer), 8192, 10_000);
        let result = producer.run().unwrap();
        assert_eq!(result, StopCondition::Eof);
        assert!(*started.lock().unwrap());
        assert_eq!(*total.lock().unwrap(), 10_000);
    }

    #[test]
    fn stop_before_run_yields_requested() {
        let consumer = CountingConsumer::default();
        let mut producer = ZeroProducer::new(Box::new(consumer), 8192, 1_000_000);
        producer.stop();
        let result = producer.run().unwrap();
        assert_eq!(result, StopCondition::Requested);
    }
}
