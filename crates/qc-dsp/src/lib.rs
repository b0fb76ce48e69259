//! qc-dsp: signal processing primitives for the QuietCall denoiser
//!
//! Everything here works on one fixed-size frame at a time and never
//! allocates after construction.
//!
//! ## Modules
//! - `transform` - Hann window, forward/inverse FFT over a frame
//! - `bands` - band table and per-band energy
//! - `pitch` - normalized cross-correlation pitch analysis
//! - `pcm` - 16-bit PCM conversion and saturation
//! - `buffer` - fallible buffer allocation

pub mod bands;
pub mod buffer;
pub mod pcm;
pub mod pitch;
pub mod transform;

mod error;

pub use bands::{BandTable, NB_BANDS};
pub use error::{DspError, DspResult};
pub use pitch::{PitchBuffer, PitchEstimate};
pub use rustfft::num_complex::Complex32;
pub use transform::{TransformEngine, TransformScratch};

/// Sample rate the frame layout is designed for
pub const SAMPLE_RATE: u32 = 48_000;

/// Samples per frame (10ms @ 48kHz)
pub const FRAME_SIZE: usize = 480;

/// Non-redundant bins of a real frame's spectrum (N/2 + 1)
pub const FREQ_SIZE: usize = FRAME_SIZE / 2 + 1;

/// Fail with `BufferMismatch` unless `got == expected`
#[inline]
pub fn check_len(expected: usize, got: usize) -> DspResult<()> {
    if expected == got {
        Ok(())
    } else {
        Err(DspError::BufferMismatch { expected, got })
    }
}
