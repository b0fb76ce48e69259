//! Error types for the gain network

use qc_dsp::DspError;
use thiserror::Error;

/// Gain network error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RnnError {
    /// Layer or model shapes disagree
    #[error("Shape mismatch in {layer}: expected {expected}, got {got}")]
    ShapeMismatch {
        layer: &'static str,
        expected: String,
        got: String,
    },

    /// Weight or bias is NaN or infinite
    #[error("Non-finite parameter in {layer} at index {index}")]
    NonFiniteWeight { layer: &'static str, index: usize },

    /// Feature or gain buffer has the wrong length
    #[error("Input length mismatch: expected {expected}, got {got}")]
    InputMismatch { expected: usize, got: usize },

    /// Recurrent state was built for a different model
    #[error("State built for {got} hidden units, model has {expected}")]
    StateMismatch { expected: usize, got: usize },

    /// Buffer allocation failed
    #[error(transparent)]
    Dsp(#[from] DspError),
}

/// Result type for gain network operations
pub type RnnResult<T> = Result<T, RnnError>;
