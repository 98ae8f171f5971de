//! DSP Error Types

use thiserror::Error;

/// Errors that can occur in the spectral engine.
#[derive(Error, Debug)]
pub enum DspError {
    #[error("FFT length must be positive, got {0}")]
    InvalidFftLength(usize),

    #[error("spectrum already open: call transform() or close() before opening again")]
    AlreadyOpen,

    #[error("spectrum not open: call open() before writing samples")]
    NotOpen,

    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(u32),

    #[error("analysis length must be positive, got {0}")]
    InvalidAnalysisLength(usize),

    #[error("window length {window} exceeds sliding-minimum capacity {capacity}")]
    WindowTooLarge { window: usize, capacity: usize },
}
