//! 16-bit PCM conversion
//!
//! Samples stay at PCM scale (no normalization to [-1, 1]) through the
//! whole pipeline; conversion back rounds and saturates.

use crate::check_len;
use crate::error::DspResult;

/// Round and clamp to the i16 range. NaN maps to 0.
#[inline]
pub fn saturate_i16(x: f32) -> i16 {
    if x.is_nan() {
        return 0;
    }
    x.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Widen PCM samples to f32
pub fn to_f32(input: &[i16], output: &mut [f32]) -> DspResult<()> {
    check_len(input.len(), output.len())?;
    for (out, &sample) in output.iter_mut().zip(input) {
        *out = sample as f32;
    }
    Ok(())
}

/// Saturate f32 samples into PCM
pub fn write_saturated(input: &[f32], output: &mut [i16]) -> DspResult<()> {
    check_len(input.len(), output.len())?;
    for (out, &sample) in output.iter_mut().zip(input) {
        *out = saturate_i16(sample);
    }
    Ok(())
}
