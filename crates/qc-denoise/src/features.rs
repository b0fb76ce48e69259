//! Feature extraction and running band estimates
//!
//! Features depend only on the current frame's band energies, its pitch
//! estimate and the stream's running estimates. The estimates themselves
//! are updated in [`BandTrackers::commit`], after the network has produced
//! the frame's VAD probability.

use crate::config::DenoiseConfig;
use crate::error::DenoiseResult;
use qc_dsp::buffer::try_filled;
use qc_dsp::pitch::{PITCH_MAX_PERIOD, PITCH_MIN_PERIOD};
use qc_dsp::{NB_BANDS, PitchEstimate, check_len};
use qc_rnn::NB_INPUTS;
use qc_rnn::layout::{ENERGY, NOISE_RATIO, PITCH_LAG, PITCH_STRENGTH, SMOOTHED_ENERGY};

/// Floor added to band energies before the log
pub const ENERGY_EPS: f32 = 1e-2;

/// Per-band running estimates of one stream
#[derive(Debug, Clone, PartialEq)]
pub struct BandTrackers {
    /// Noise energy estimate per band
    noise: Vec<f32>,
    /// Speech energy estimate per band
    speech: Vec<f32>,
    /// Smoothed log10 energy per band
    smoothed_log: Vec<f32>,
}

impl BandTrackers {
    /// Zeroed estimates
    pub fn try_new() -> DenoiseResult<Self> {
        Ok(Self {
            noise: try_filled(NB_BANDS, 0.0)?,
            speech: try_filled(NB_BANDS, 0.0)?,
            smoothed_log: try_filled(NB_BANDS, 0.0)?,
        })
    }

    pub fn noise_energy(&self) -> &[f32] {
        &self.noise
    }

    pub fn speech_energy(&self) -> &[f32] {
        &self.speech
    }

    pub fn smoothed_log_energy(&self) -> &[f32] {
        &self.smoothed_log
    }

    /// Build the network input for one frame
    ///
    /// Reads the trackers but does not update them.
    pub fn compute_features(
        &self,
        energy: &[f32],
        pitch: PitchEstimate,
        config: &DenoiseConfig,
        features: &mut [f32],
    ) -> DenoiseResult<()> {
        check_len(NB_BANDS, energy.len())?;
        check_len(NB_INPUTS, features.len())?;

        let alpha = config.energy_smoothing;
        for b in 0..NB_BANDS {
            let log_energy = (energy[b] + ENERGY_EPS).log10();
            features[ENERGY + b] = log_energy;
            features[SMOOTHED_ENERGY + b] =
                (1.0 - alpha) * self.smoothed_log[b] + alpha * log_energy;
            features[NOISE_RATIO + b] =
                self.noise[b] / (self.noise[b] + self.speech[b] + config.noise_floor);
        }

        features[PITCH_STRENGTH] = pitch.strength.clamp(0.0, 1.0);
        features[PITCH_LAG] = normalized_lag(pitch.lag);

        Ok(())
    }

    /// Fold the frame into the running estimates
    ///
    /// `features` must be the vector `compute_features` produced for the
    /// same frame.
    pub fn commit(&mut self, energy: &[f32], features: &[f32], vad: f32, config: &DenoiseConfig) {
        let floor = config.activity_floor;
        let speech_weight = vad.clamp(floor, 1.0 - floor);
        let noise_rate = config.band_smoothing * (1.0 - speech_weight);
        let speech_rate = config.band_smoothing * speech_weight;

        for b in 0..NB_BANDS.min(energy.len()) {
            self.noise[b] += noise_rate * (energy[b] - self.noise[b]);
            self.speech[b] += speech_rate * (energy[b] - self.speech[b]);
        }

        if let Some(smoothed) = features.get(SMOOTHED_ENERGY..SMOOTHED_ENERGY + NB_BANDS) {
            self.smoothed_log.copy_from_slice(smoothed);
        }
    }

    pub fn reset(&mut self) {
        self.noise.fill(0.0);
        self.speech.fill(0.0);
        self.smoothed_log.fill(0.0);
    }
}

/// Lag mapped onto [0, 1] over the search range
fn normalized_lag(lag: usize) -> f32 {
    let span = (PITCH_MAX_PERIOD - PITCH_MIN_PERIOD) as f32;
    (lag.saturating_sub(PITCH_MIN_PERIOD) as f32 / span).clamp(0.0, 1.0)
}
