//! Rotating sound-file recorder: a `Consumer` that writes incoming samples
//! to a sequence of WAV files, each capped at a configured sample count,
//! named `<prefix>000.wav`, `<prefix>001.wav`, ...

use std::io;
use std::path::PathBuf;

use hound::{SampleFormat, WavSpec, WavWriter};
use tuna_core::{Buffer, Consumer, PipelineError, PipelineResult, Sample, Timestamp};

pub struct Recorder {
    prefix: PathBuf,
    samples_per_file: usize,
    sample_rate: u32,
    writer: Option<WavWriter<io::BufWriter<std::fs::File>>>,
    file_index: u32,
    written_in_file: usize,
}

impl Recorder {
    pub fn new(prefix: impl Into<PathBuf>, samples_per_file: usize) -> Self {
        Recorder {
            prefix: prefix.into(),
            samples_per_file: samples_per_file.max(1),
            sample_rate: 0,
            writer: None,
            file_index: 0,
            written_in_file: 0,
        }
    }

    fn path_for(&self, index: u32) -> PathBuf {
        let mut path = self.prefix.clone();
        let mut name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push_str(&format!("{index:03}.wav"));
        path.set_file_name(name);
        path
    }

    fn open_next_file(&mut self) -> PipelineResult<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| PipelineError::SinkIo(e.to_string()))?;
        }

        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Int,
        };
        let path = self.path_for(self.file_index);
        let writer =
            WavWriter::create(&path, spec).map_err(|e| PipelineError::SinkIo(e.to_string()))?;

        self.writer = Some(writer);
        self.file_index += 1;
        self.written_in_file = 0;
        Ok(())
    }

    fn write_sample(&mut self, s: Sample) -> PipelineResult<()> {
        if self.written_in_file >= self.samples_per_file {
            self.open_next_file()?;
        }
        self.writer
            .as_mut()
            .expect("opened by start() before any write()")
            .write_sample(s)
            .map_err(|e| PipelineError::SinkIo(e.to_string()))?;
        self.written_in_file += 1;
        Ok(())
    }
}

impl Consumer for Recorder {
    fn start(&mut self, sample_rate: u32, _ts: Timestamp) -> PipelineResult<()> {
        self.sample_rate = sample_rate;
        self.file_index = 0;
        self.open_next_file()
    }

    fn write(&mut self, buf: Buffer, count: usize) -> PipelineResult<()> {
        for &s in &buf.as_slice()[..count] {
            self.write_sample(s)?;
        }
        Ok(())
    }

    fn resync(&mut self, _ts: Timestamp) -> PipelineResult<()> {
        self.open_next_file()
    }

    fn exit(&mut self) -> PipelineResult<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| PipelineError::SinkIo(e.to_string()))?;
        }
        Ok(())
    }
}
