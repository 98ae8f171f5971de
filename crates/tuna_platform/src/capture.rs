//! Live capture producer: pulls audio from a `cpal` input device through an
//! `rtrb` ring buffer into the producer thread, matching the ring-buffer
//! bridge pattern used to get real-time audio off the callback thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;
use tuna_core::{Buffer, Consumer, PipelineError, PipelineResult, Producer, Sample, StopCondition, Timestamp};

use crate::error::PlatformError;

const RING_CAPACITY: usize = 1 << 16;
const CHUNK: usize = 4096;

pub struct CaptureProducer {
    device_name: Option<String>,
    downstream: Box<dyn Consumer>,
    stop: Arc<AtomicBool>,
}

impl CaptureProducer {
    pub fn new(device_name: Option<String>, downstream: Box<dyn Consumer>) -> Self {
        CaptureProducer {
            device_name,
            downstream,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn open_device(&self) -> Result<cpal::Device, PlatformError> {
        let host = cpal::default_host();
        match &self.device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| PlatformError::Device(e.to_string()))?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or_else(|| PlatformError::Device(format!("no input device named {name:?}"))),
            None => host.default_input_device().ok_or(PlatformError::NoDefaultDevice),
        }
    }
}

impl Producer for CaptureProducer {
    fn run(&mut self) -> PipelineResult<StopCondition> {
        let device = self
            .open_device()
            .map_err(|e| PipelineError::Source(e.to_string()))?;
        let config = device
            .default_input_config()
            .map_err(|e| PipelineError::Source(e.to_string()))?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        let (mut producer, mut consumer) = RingBuffer::<Sample>::new(RING_CAPACITY);
        let overrun = Arc::new(AtomicBool::new(false));
        let stream_overrun = Arc::clone(&overrun);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config.into(),
                move |data: &[f32], _| {
                    for frame in data.chunks(channels) {
                        let mixed = frame[0];
                        let sample = (mixed * i32::MAX as f32) as Sample;
                        if producer.push(sample).is_err() {
                            stream_overrun.store(true, Ordering::Release);
                        }
                    }
                },
                move |_err| {},
                None,
            ),
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config.into(),
                move |data: &[i16], _| {
                    for frame in data.chunks(channels) {
                        let sample = (frame[0] as i32) << 16;
                        if producer.push(sample).is_err() {
                            stream_overrun.store(true, Ordering::Release);
                        }
                    }
                },
                move |_err| {},
                None,
            ),
            other => {
                return Err(PipelineError::Source(format!(
                    "unsupported capture sample format: {other:?}"
                )))
            }
        }
        .map_err(PlatformError::from)
        .map_err(|e| PipelineError::Source(e.to_string()))?;

        stream
            .play()
            .map_err(PlatformError::from)
            .map_err(|e| PipelineError::Source(e.to_string()))?;

        self.downstream.start(sample_rate, Timestamp::ZERO)?;

        let mut staging = Vec::with_capacity(CHUNK);
        loop {
            if self.stop.load(Ordering::Acquire) {
                drop(stream);
                if !staging.is_empty() {
                    let mut buf = Buffer::acquire(staging.len());
                    buf.as_mut_slice().copy_from_slice(&staging);
                    self.downstream.write(buf, staging.len())?;
                }
                self.downstream.exit()?;
                return Ok(StopCondition::Requested);
            }

            match consumer.pop() {
                Ok(sample) => {
                    staging.push(sample);
                    if staging.len() == CHUNK {
                        let mut buf = Buffer::acquire(staging.len());
                        buf.as_mut_slice().copy_from_slice(&staging);
                        self.downstream.write(buf, staging.len())?;
                        staging.clear();
                    }
                }
                Err(rtrb::PopError::Empty) => {
                    if overrun.swap(false, Ordering::AcqRel) {
                        tracing::warn!("capture ring buffer overrun, samples were dropped");
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        }
    }

    fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }
}
