//! Pipeline error types

use thiserror::Error;

/// Errors that can occur while driving the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("allocation failed: {0}")]
    Allocation(String),

    #[error("source I/O error: {0}")]
    SourceIo(#[from] std::io::Error),

    #[error("source error: {0}")]
    Source(String),

    #[error("sink I/O error: {0}")]
    SinkIo(String),

    #[error("dsp error: {0}")]
    Dsp(#[from] tuna_dsp::DspError),

    #[error("cross-thread queue worker failed: {0}")]
    WorkerFailed(String),

    #[error("cross-thread queue saw more than {limit} consecutive dequeue anomalies")]
    WorkerAnomaly { limit: u32 },

    #[error("protocol violation: {0}")]
    Protocol(&'static str),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::WorkerAnomaly { limit: 5 };
        assert!(err.to_string().contains('5'));

        let err = PipelineError::Protocol("write before start");
        assert!(err.to_string().contains("write before start"));
    }

    #[test]
    fn test_error_from_dsp() {
        let dsp_err = tuna_dsp::DspError::InvalidFftLength(0);
        let pipeline_err: PipelineError = dsp_err.into();
        assert!(matches!(pipeline_err, PipelineError::Dsp(_)));
    }
}
