//! Error types for the denoiser

use qc_dsp::DspError;
use qc_rnn::RnnError;
use thiserror::Error;

/// Denoiser error types
#[derive(Error, Debug)]
pub enum DenoiseError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Buffer size mismatch
    #[error("Buffer size mismatch: expected {expected}, got {got}")]
    BufferMismatch { expected: usize, got: usize },

    /// Stream buffers could not be allocated
    #[error("Allocation of {len} elements failed")]
    AllocationFailed { len: usize },

    /// Configuration JSON could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Signal processing error
    #[error(transparent)]
    Dsp(DspError),

    /// Gain network error
    #[error(transparent)]
    Rnn(RnnError),
}

impl From<DspError> for DenoiseError {
    fn from(err: DspError) -> Self {
        match err {
            DspError::BufferMismatch { expected, got } => Self::BufferMismatch { expected, got },
            DspError::AllocationFailed { len } => Self::AllocationFailed { len },
            other => Self::Dsp(other),
        }
    }
}

impl From<RnnError> for DenoiseError {
    fn from(err: RnnError) -> Self {
        match err {
            RnnError::Dsp(inner) => inner.into(),
            other => Self::Rnn(other),
        }
    }
}

/// Result type for denoiser operations
pub type DenoiseResult<T> = Result<T, DenoiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dsp_errors_flatten() {
        let err: DenoiseError = DspError::BufferMismatch {
            expected: 480,
            got: 479,
        }
        .into();
        assert!(matches!(
            err,
            DenoiseError::BufferMismatch {
                expected: 480,
                got: 479
            }
        ));

        let err: DenoiseError = RnnError::Dsp(DspError::AllocationFailed { len: 7 }).into();
        assert!(matches!(err, DenoiseError::AllocationFailed { len: 7 }));
    }

    #[test]
    fn test_rnn_errors_wrap() {
        let err: DenoiseError = RnnError::InputMismatch {
            expected: 68,
            got: 3,
        }
        .into();
        assert!(matches!(err, DenoiseError::Rnn(_)));
        assert_eq!(err.to_string(), "Input length mismatch: expected 68, got 3");
    }
}
