//! Error types for DSP primitives

use thiserror::Error;

/// DSP error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DspError {
    /// Buffer size mismatch
    #[error("Buffer size mismatch: expected {expected}, got {got}")]
    BufferMismatch { expected: usize, got: usize },

    /// Transform length not usable
    #[error("Invalid frame size: {0}")]
    InvalidFrameSize(usize),

    /// Band edges do not partition the spectrum
    #[error("Invalid band table: {0}")]
    InvalidBandTable(String),

    /// Pitch lag range is empty or starts at zero
    #[error("Invalid lag range: {min}..={max}")]
    InvalidLagRange { min: usize, max: usize },

    /// Buffer allocation failed
    #[error("Allocation of {len} elements failed")]
    AllocationFailed { len: usize },
}

/// Result type for DSP operations
pub type DspResult<T> = Result<T, DspError>;
