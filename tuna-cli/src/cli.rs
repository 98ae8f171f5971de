use clap::Parser;

/// Real-time underwater-acoustic analysis pipeline.
#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Input source: "sndfile:PATH", "alsa:DEVICE" (or "alsa:default"), "zero"
    #[arg(short, long)]
    pub input: String,

    /// Output sink, repeatable: "time_slice:PATH.csv", "pulse:PATH.csv",
    /// "sndfile:PATH_PREFIX", "null"
    #[arg(short, long = "output")]
    pub outputs: Vec<String>,

    /// Sample rate in Hz, required for sources that don't declare their own
    /// (e.g. "zero"); ignored for sources that do (sound files, capture).
    #[arg(short = 'r', long = "sample-rate")]
    pub sample_rate: Option<u32>,

    /// Path to a log file opened in append mode, in addition to stderr.
    #[arg(short, long)]
    pub log_file: Option<std::path::PathBuf>,
}
