//! Sound-file producer: decodes a WAV file and feeds it to a downstream
//! consumer as mono `Sample` buffers.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hound::{SampleFormat, WavReader};
use tuna_core::{Buffer, Consumer, PipelineError, PipelineResult, Producer, Sample, StopCondition, Timestamp};

use crate::error::PlatformError;

const CHUNK: usize = 4096;

pub struct SndFileProducer {
    path: PathBuf,
    downstream: Box<dyn Consumer>,
    stop: Arc<AtomicBool>,
}

impl SndFileProducer {
    pub fn new(path: impl AsRef<Path>, downstream: Box<dyn Consumer>) -> Self {
        SndFileProducer {
            path: path.as_ref().to_path_buf(),
            downstream,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn flush(downstream: &mut dyn Consumer, staging: &mut Vec<Sample>) -> PipelineResult<()> {
        if staging.is_empty() {
            return Ok(());
        }
        let mut buf = Buffer::acquire(staging.len());
        buf.as_mut_slice().copy_from_slice(staging);
        downstream.write(buf, staging.len())?;
        staging.clear();
        Ok(())
    }
}

impl Producer for SndFileProducer {
    fn run(&mut self) -> PipelineResult<StopCondition> {
        let mut reader = WavReader::open(&self.path)
            .map_err(PlatformError::from)
            .map_err(|e| PipelineError::Source(e.to_string()))?;
        let spec = reader.spec();

        self.downstream.start(spec.sample_rate, Timestamp::ZERO)?;

        let mut staging = Vec::with_capacity(CHUNK);

        match spec.sample_format {
            SampleFormat::Int => {
                for sample in reader.samples::<i32>() {
                    if self.stop.load(Ordering::Acquire) {
                        Self::flush(self.downstream.as_mut(), &mut staging)?;
                        self.downstream.exit()?;
                        return Ok(StopCondition::Requested);
                    }
                    let v = sample.map_err(|e| PipelineError::Source(e.to_string()))?;
                    let widened = v << (32 - spec.bits_per_sample);
                    staging.push(widened);
                    if staging.len() == CHUNK {
                        Self::flush(self.downstream.as_mut(), &mut staging)?;
                    }
                }
            }
            SampleFormat::Float => {
                for sample in reader.samples::<f32>() {
                    if self.stop.load(Ordering::Acquire) {
                        Self::flush(self.downstream.as_mut(), &mut staging)?;
                        self.downstream.exit()?;
                        return Ok(StopCondition::Requested);
                    }
                    let v = sample.map_err(|e| PipelineError::Source(e.to_string()))?;
                    staging.push((v * i32::MAX as f32) as Sample);
                    if staging.len() == CHUNK {
                        Self::flush(self.downstream.as_mut(), &mut staging)?;
                    }
                }
            }
        }

        Self::flush(self.downstream.as_mut(), &mut staging)?;
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
    struct CollectingConsumer {
        samples: Arc<Mutex<Vec<Sample>>>,
        sample_rate: Arc<Mutex<u32>>,
    }

    impl Consumer for CollectingConsumer {
        fn start(&mut self, sample_rate: u32, _ts: Timestamp) -> PipelineResult<()> {
            *self.sample_rate.lock().unwrap() = sample_rate;
            Ok(())
        }
        fn write(&mut self, buf: Buffer, count: usize) -> PipelineResult<()> {
            self.samples
                .lock()
                .unwrap()
                .extend_from_slice(&buf.as_slice()[..count]);
            Ok(())
        }
        fn resync(&mut self, _ts: Timestamp) -> PipelineResult<()> {
            Ok(())
        }
        fn exit(&mut self) -> PipelineResult<()> {
            Ok(())
        }
    }

    fn write_test_wav(path: &Path, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_every_sample_in_order() {
        let dir = std::env::temp_dir();
        let path = dir.join("tuna_sndfile_producer_test.wav");
        let input: Vec<i16> = (0..100).map(|i| (i * 100) as i16).collect();
        write_test_wav(&path, &input);

        let samples = Arc::new(Mutex::new(Vec::new()));
        let rate = Arc::new(Mutex::new(0));
        let consumer = CollectingConsumer {
            samples: Arc::clone(&samples),
            sample_rate: Arc::clone(&rate),
        };
        let mut producer = SndFileProducer::new(&path, Box::new(consumer));
        let result = producer.run().unwrap();

        assert_eq!(result, StopCondition::Eof);
        assert_eq!(*rate.lock().unwrap(), 8000);
        assert_eq!(samples.lock().unwrap().len(), 100);

        let _ = std::fs::remove_file(&path);
    }
}
