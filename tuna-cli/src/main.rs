mod cli;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tuna_core::{
    Buffer, Consumer, CrossThreadQueue, PipelineResult, Producer, Pulse, PulseParams,
    StopCondition, TimeSlice, Timestamp,
};
use tuna_platform::{CaptureProducer, CsvSink, Recorder, SndFileProducer, ZeroProducer};

use cli::Cli;

/// Samples per rotated recorder file when an `sndfile:` output is requested.
const RECORDER_SAMPLES_PER_FILE: usize = 10 * 60 * 48_000;

/// Default run length for the `zero` input when no explicit duration is given.
const DEFAULT_ZERO_DURATION_SECONDS: u32 = 60;

/// A `Consumer` that discards everything, used for `--output null` and as
/// the implicit output when none was given at all.
struct DiscardConsumer;

impl Consumer for DiscardConsumer {
    fn start(&mut self, _sample_rate: u32, _ts: Timestamp) -> PipelineResult<()> {
        Ok(())
    }
    fn write(&mut self, _buf: Buffer, _count: usize) -> PipelineResult<()> {
        Ok(())
    }
    fn resync(&mut self, _ts: Timestamp) -> PipelineResult<()> {
        Ok(())
    }
    fn exit(&mut self) -> PipelineResult<()> {
        Ok(())
    }
}

/// Broadcasts every call to each of its downstream consumers in order.
struct Fanout(Vec<Box<dyn Consumer>>);

impl Consumer for Fanout {
    fn start(&mut self, sample_rate: u32, ts: Timestamp) -> PipelineResult<()> {
        for c in &mut self.0 {
            c.start(sample_rate, ts)?;
        }
        Ok(())
    }

    fn write(&mut self, buf: Buffer, count: usize) -> PipelineResult<()> {
        for c in &mut self.0 {
            c.write(buf.clone(), count)?;
        }
        Ok(())
    }

    fn resync(&mut self, ts: Timestamp) -> PipelineResult<()> {
        for c in &mut self.0 {
            c.resync(ts)?;
        }
        Ok(())
    }

    fn exit(&mut self) -> PipelineResult<()> {
        for c in &mut self.0 {
            c.exit()?;
        }
        Ok(())
    }
}

/// Adapts the non-blocking, infallible [`CrossThreadQueue`] push API to the
/// fallible [`Consumer`] contract the producer side drives.
struct QueueConsumer(Option<CrossThreadQueue>);

impl Consumer for QueueConsumer {
    fn start(&mut self, sample_rate: u32, ts: Timestamp) -> PipelineResult<()> {
        self.0
            .as_ref()
            .expect("queue not yet exited")
            .start(sample_rate, ts);
        Ok(())
    }

    fn write(&mut self, buf: Buffer, count: usize) -> PipelineResult<()> {
        self.0.as_ref().expect("queue not yet exited").write(buf, count);
        Ok(())
    }

    fn resync(&mut self, ts: Timestamp) -> PipelineResult<()> {
        self.0.as_ref().expect("queue not yet exited").resync(ts);
        Ok(())
    }

    fn exit(&mut self) -> PipelineResult<()> {
        self.0.take().expect("exit called twice").exit()
    }
}

fn split_spec(spec: &str) -> Result<(&str, &str)> {
    if spec == "zero" || spec == "null" {
        return Ok((spec, ""));
    }
    spec.split_once(':')
        .ok_or_else(|| anyhow!("malformed spec {spec:?}: expected \"kind:value\""))
}

fn build_output(spec: &str) -> Result<Box<dyn Consumer>> {
    let (kind, value) = split_spec(spec)?;
    match kind {
        "time_slice" => {
            let sink = CsvSink::create(value)
                .with_context(|| format!("opening time-slice output {value:?}"))?;
            Ok(Box::new(TimeSlice::new(Box::new(sink))))
        }
        "pulse" => {
            let sink =
                CsvSink::create(value).with_context(|| format!("opening pulse output {value:?}"))?;
            Ok(Box::new(Pulse::new(Box::new(sink), PulseParams::default())))
        }
        "sndfile" => Ok(Box::new(Recorder::new(
            PathBuf::from(value),
            RECORDER_SAMPLES_PER_FILE,
        ))),
        "null" => Ok(Box::new(DiscardConsumer)),
        other => bail!("unsupported output kind: {other}"),
    }
}

/// Builds the requested producer and returns a handle the caller can use to
/// request an early stop from another thread.
fn build_producer(
    spec: &str,
    sample_rate: Option<u32>,
    downstream: Box<dyn Consumer>,
) -> Result<(Box<dyn Producer>, Arc<AtomicBool>)> {
    let (kind, value) = split_spec(spec)?;
    match kind {
        "sndfile" => {
            let producer = SndFileProducer::new(value, downstream);
            let handle = producer.stop_handle();
            Ok((Box::new(producer), handle))
        }
        "alsa" => {
            let device = (value != "default" && !value.is_empty()).then(|| value.to_string());
            let producer = CaptureProducer::new(device, downstream);
            let handle = producer.stop_handle();
            Ok((Box::new(producer), handle))
        }
        "zero" => {
            let rate = sample_rate.unwrap_or(8192);
            let total = rate as usize * DEFAULT_ZERO_DURATION_SECONDS as usize;
            let producer = ZeroProducer::new(downstream, rate, total);
            let handle = producer.stop_handle();
            Ok((Box::new(producer), handle))
        }
        "ads1672" => bail!("ads1672 input is reserved but not implemented in this build"),
        other => bail!("unsupported input kind: {other}"),
    }
}

fn init_logging(log_file: Option<PathBuf>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .expect("log file must be writable");
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

fn main() -> std::process::ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:?}");
            std::process::ExitCode::FAILURE
        }
    }
}

fn run() -> Result<std::process::ExitCode> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_file.clone());

    let outputs = if cli.outputs.is_empty() {
        vec![Box::new(DiscardConsumer) as Box<dyn Consumer>]
    } else {
        cli.outputs
            .iter()
            .map(|s| build_output(s))
            .collect::<Result<Vec<_>>>()?
    };

    let fanout: Box<dyn Consumer> = Box::new(Fanout(outputs));
    let queue = CrossThreadQueue::spawn(fanout);
    let queue_consumer: Box<dyn Consumer> = Box::new(QueueConsumer(Some(queue)));

    let (mut producer, stop_handle) = build_producer(&cli.input, cli.sample_rate, queue_consumer)?;

    // Ctrl-C only signals a side channel; it never touches the data-plane
    // queue directly, matching the UI/audio-thread split the core engine
    // this was adapted from uses for its own command channel.
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("installing Ctrl-C handler")?;

    let result = std::thread::scope(|scope| -> Result<StopCondition> {
        scope.spawn(move || {
            if stop_rx.recv().is_ok() {
                stop_handle.store(true, std::sync::atomic::Ordering::Release);
            }
        });

        producer.run().map_err(|e| anyhow!(e))
    })?;

    match result {
        StopCondition::Eof => {
            tracing::info!("input exhausted, exiting cleanly");
            Ok(std::process::ExitCode::SUCCESS)
        }
        StopCondition::Requested => {
            tracing::info!("stopped on request");
            Ok(std::process::ExitCode::SUCCESS)
        }
    }
}
