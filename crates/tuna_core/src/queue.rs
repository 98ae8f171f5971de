//! Cross-thread queue
//!
//! Decouples a producer thread from whatever consumer work happens
//! downstream: `write`/`start`/`resync` append an event and return
//! immediately, and a dedicated worker thread drains the queue in order and
//! replays each event onto a downstream [`Consumer`].
//!
//! The original implementation used a recursive mutex so that a signalling
//! call could re-enter the lock already held by the worker. Nothing here
//! re-enters the lock on the same thread, so a plain, non-recursive
//! `Mutex` plus `Condvar` is sufficient — there is no analogue of the
//! original's free-stack entry recycling either, since `VecDeque` already
//! amortises its own allocation and Rust gives us no incentive to hand-roll
//! a node pool for it.

use crate::buffer::Buffer;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::Consumer;
use crate::timestamp::Timestamp;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// More than this many consecutive wakeups with nothing to dequeue is
/// treated as a fatal worker anomaly.
const MAX_CONSECUTIVE_ANOMALIES: u32 = 5;

enum Event {
    Start(u32, Timestamp),
    Write(Buffer, usize),
    Resync(Timestamp),
}

struct Shared {
    queue: Mutex<VecDeque<Event>>,
    not_empty: Condvar,
    exiting: std::sync::atomic::AtomicBool,
}

/// Owns the worker thread and the event queue feeding it.
pub struct CrossThreadQueue {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<PipelineResult<()>>>,
}

impl CrossThreadQueue {
    /// Spawn the worker thread, which will forward every queued event to
    /// `downstream` until `exit` is called.
    pub fn spawn(mut downstream: Box<dyn Consumer>) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            exiting: std::sync::atomic::AtomicBool::new(false),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || -> PipelineResult<()> {
            let mut anomalies = 0u32;
            loop {
                let event = {
                    let mut queue = worker_shared.queue.lock().unwrap();
                    loop {
                        if let Some(event) = queue.pop_front() {
                            break Some(event);
                        }
                        if worker_shared
                            .exiting
                            .load(std::sync::atomic::Ordering::Acquire)
                        {
                            break None;
                        }
                        queue = worker_shared.not_empty.wait(queue).unwrap();
                        if queue.is_empty()
                            && !worker_shared
                                .exiting
                                .load(std::sync::atomic::Ordering::Acquire)
                        {
                            anomalies += 1;
                            if anomalies > MAX_CONSECUTIVE_ANOMALIES {
                                return Err(PipelineError::WorkerAnomaly {
                                    limit: MAX_CONSECUTIVE_ANOMALIES,
                                });
                            }
                        }
                    }
                };

                let Some(event) = event else {
                    return downstream.exit();
                };
                anomalies = 0;

                match event {
                    Event::Start(rate, ts) => downstream.start(rate, ts)?,
                    Event::Write(buf, count) => downstream.write(buf, count)?,
                    Event::Resync(ts) => downstream.resync(ts)?,
                }
            }
        });

        CrossThreadQueue {
            shared,
            worker: Some(worker),
        }
    }

    fn push(&self, event: Event) {
        let mut queue = self.shared.queue.lock().unwrap();
        queue.push_back(event);
        self.shared.not_empty.notify_one();
    }

    pub fn start(&self, sample_rate: u32, ts: Timestamp) {
        self.push(Event::Start(sample_rate, ts));
    }

    pub fn write(&self, buf: Buffer, count: usize) {
        self.push(Event::Write(buf, count));
    }

    pub fn resync(&self, ts: Timestamp) {
        self.push(Event::Resync(ts));
    }

    /// Signal the worker to stop once it drains any queued events, and
    /// join it. The worker calls `downstream.exit()` itself once the queue
    /// is empty, so the terminal status returned here is whatever that
    /// call returned.
    pub fn exit(mut self) -> PipelineResult<()> {
        self.shared
            .exiting
            .store(true, std::sync::atomic::Ordering::Release);
        self.shared.not_empty.notify_all();
        match self.worker.take() {
            Some(handle) => handle.join().unwrap_or(Ok(())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Log(Arc<StdMutex<Vec<String>>>);

    struct Recording(Arc<StdMutex<Vec<String>>>);

    impl Consumer for Recording {
        fn start(&mut self, sample_rate: u32, ts: Timestamp) -> PipelineResult<()> {
            self.0
                .lock()
                .unwrap()
                .push(format!("start({sample_rate},{ts})"));
            Ok(())
        }
        fn write(&mut self, buf: Buffer, count: usize) -> PipelineResult<()> {
            self.0
                .lock()
                .unwrap()
                .push(format!("write({},{count})", buf.len()));
            Ok(())
        }
        fn resync(&mut self, ts: Timestamp) -> PipelineResult<()> {
            self.0.lock().unwrap().push(format!("resync({ts})"));
            Ok(())
        }
        fn exit(&mut self) -> PipelineResult<()> {
            self.0.lock().unwrap().push("exit".into());
            Ok(())
        }
    }

    #[test]
    fn events_are_delivered_in_fifo_order() {
        let log = Log::default();
        let consumer = Recording(Arc::clone(&log.0));
        let queue = CrossThreadQueue::spawn(Box::new(consumer));

        queue.start(8192, Timestamp::ZERO);
        for i in 0..10 {
            queue.write(Buffer::acquire(4), i);
        }
        queue.resync(Timestamp::ZERO);
        for i in 0..10 {
            queue.write(Buffer::acquire(4), i);
        }

        queue.exit().unwrap();

        let events = log.0.lock().unwrap();
        assert_eq!(events[0], "start(8192,0.000000000)");
        assert_eq!(events[11], "resync(0.000000000)");
        assert_eq!(events.last().unwrap(), "exit");
        assert_eq!(events.len(), 23);
    }

    #[test]
    fn buffer_refcounts_return_to_one_after_round_trip() {
        let log = Log::default();
        let consumer = Recording(Arc::clone(&log.0));
        let queue = CrossThreadQueue::spawn(Box::new(consumer));

        let buf = Buffer::acquire(8);
        let shared = buf.clone();
        queue.write(buf, 8);
        queue.exit().unwrap();

        assert_eq!(shared.refcount(), 1);
    }

    #[test]
    fn exit_terminates_worker_even_with_no_events() {
        let log = Log::default();
        let consumer = Recording(Arc::clone(&log.0));
        let queue = CrossThreadQueue::spawn(Box::new(consumer));
        queue.exit().unwrap();
    }
}
