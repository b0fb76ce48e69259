//! Temporal gain smoothing and spectral gain application

use crate::config::DenoiseConfig;
use crate::error::DenoiseResult;
use qc_dsp::{BandTable, Complex32, check_len};

/// Asymmetric per-band exponential smoother
///
/// `g = c * g_prev + (1 - c) * raw`, with `c = attack` while the gain
/// rises and `c = release` while it falls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainSmoother {
    attack: f32,
    release: f32,
}

impl GainSmoother {
    pub fn new(attack: f32, release: f32) -> Self {
        Self { attack, release }
    }

    pub fn from_config(config: &DenoiseConfig) -> Self {
        Self::new(config.attack, config.release)
    }

    pub fn attack(&self) -> f32 {
        self.attack
    }

    pub fn release(&self) -> f32 {
        self.release
    }

    /// Move `history` toward `raw` in place
    ///
    /// A NaN target counts as 0, so `history` never holds NaN.
    pub fn smooth(&self, raw: &[f32], history: &mut [f32]) -> DenoiseResult<()> {
        check_len(history.len(), raw.len())?;

        for (g, &target) in history.iter_mut().zip(raw) {
            let target = if target.is_nan() {
                0.0
            } else {
                target.clamp(0.0, 1.0)
            };
            let prev = if g.is_nan() { 0.0 } else { *g };
            let c = if target >= prev {
                self.attack
            } else {
                self.release
            };
            *g = (c * prev + (1.0 - c) * target).clamp(0.0, 1.0);
        }
        Ok(())
    }

    /// Scale every bin by its band's gain
    ///
    /// Mirrored bins share their band, so a Hermitian spectrum stays
    /// Hermitian and the reconstruction stays real.
    pub fn apply(spectrum: &mut [Complex32], gains: &[f32], bands: &BandTable) -> DenoiseResult<()> {
        check_len(bands.fft_size(), spectrum.len())?;
        check_len(bands.len(), gains.len())?;

        for (bin, &band) in spectrum.iter_mut().zip(bands.bin_bands()) {
            *bin *= gains[band];
        }
        Ok(())
    }
}

impl Default for GainSmoother {
    fn default() -> Self {
        Self::from_config(&DenoiseConfig::default())
    }
}
