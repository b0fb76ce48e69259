//! Status codes returned across the C ABI

use qc_denoise::DenoiseError;
use std::fmt;

/// Negative codes are failures; `process_frame` returns them in place of
/// the VAD probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum QcStatus {
    /// Success
    Ok = 0,
    /// Handle was never issued or already destroyed
    UnknownHandle = -1,
    /// Null pointer, wrong length, aliased buffers or bad config
    InvalidArgument = -2,
    /// Another thread is processing on the same handle
    Busy = -3,
    /// Allocation or internal processing failure
    Internal = -4,
}

impl QcStatus {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Code as returned by the frame functions
    pub fn as_f32(self) -> f32 {
        self.code() as f32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            -1 => Some(Self::UnknownHandle),
            -2 => Some(Self::InvalidArgument),
            -3 => Some(Self::Busy),
            -4 => Some(Self::Internal),
            _ => None,
        }
    }
}

impl fmt::Display for QcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QcStatus::Ok => write!(f, "Ok"),
            QcStatus::UnknownHandle => write!(f, "Unknown handle"),
            QcStatus::InvalidArgument => write!(f, "Invalid argument"),
            QcStatus::Busy => write!(f, "Handle busy"),
            QcStatus::Internal => write!(f, "Internal error"),
        }
    }
}

impl From<&DenoiseError> for QcStatus {
    fn from(err: &DenoiseError) -> Self {
        match err {
            DenoiseError::BufferMismatch { .. }
            | DenoiseError::InvalidConfig(_)
            | DenoiseError::ConfigParse(_) => QcStatus::InvalidArgument,
            DenoiseError::AllocationFailed { .. }
            | DenoiseError::Dsp(_)
            | DenoiseError::Rnn(_) => QcStatus::Internal,
        }
    }
}
