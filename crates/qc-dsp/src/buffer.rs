//! Fallible buffer allocation
//!
//! Stream state is sized once at creation. Allocation goes through
//! `try_reserve_exact` so running out of memory surfaces as an error
//! instead of aborting the host process.

use crate::error::{DspError, DspResult};

/// Allocate a vector of `len` copies of `value`
pub fn try_filled<T: Clone>(len: usize, value: T) -> DspResult<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| DspError::AllocationFailed { len })?;
    buf.resize(len, value);
    Ok(buf)
}
