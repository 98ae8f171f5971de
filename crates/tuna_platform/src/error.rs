//! Platform driver error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("unsupported input/output kind: {0}")]
    UnsupportedKind(String),

    #[error("malformed device/output spec {spec:?}: expected \"kind:value\"")]
    MalformedSpec { spec: String },

    #[error("sound file error: {0}")]
    SoundFile(#[from] hound::Error),

    #[error("no default capture device available")]
    NoDefaultDevice,

    #[error("capture device error: {0}")]
    Device(String),

    #[error("capture stream build error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("capture stream play error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] tuna_core::PipelineError),
}
