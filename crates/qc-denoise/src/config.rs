//! Denoiser configuration

use crate::error::{DenoiseError, DenoiseResult};
use serde::{Deserialize, Serialize};

/// Per-stream tuning
///
/// Smoothing coefficients weight the previous value: `0.0` follows the
/// input immediately, values close to `1.0` react slowly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseConfig {
    /// Gain smoothing coefficient while the gain rises
    pub attack: f32,

    /// Gain smoothing coefficient while the gain falls
    /// Must be >= `attack`.
    pub release: f32,

    /// Rate of the per-band noise and speech energy trackers
    pub band_smoothing: f32,

    /// Rate of the smoothed log band energy feature
    pub energy_smoothing: f32,

    /// VAD probability at or above which a frame counts as speech
    pub vad_threshold: f32,

    /// Regularizer of the noise/speech ratio
    pub noise_floor: f32,

    /// Tracker weights are clamped to [floor, 1 - floor]
    /// so neither estimate freezes completely.
    pub activity_floor: f32,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            attack: 0.95,
            release: 0.99,
            band_smoothing: 0.05,
            energy_smoothing: 0.2,
            vad_threshold: 0.8,
            noise_floor: 0.001,
            activity_floor: 0.02,
        }
    }
}

impl DenoiseConfig {
    /// Real-time speech enhancement (the defaults)
    pub fn realtime_speech() -> Self {
        Self::default()
    }

    /// Faster gain release and noise tracking
    pub fn aggressive() -> Self {
        Self {
            attack: 0.9,
            release: 0.93,
            band_smoothing: 0.1,
            vad_threshold: 0.7,
            ..Self::default()
        }
    }

    /// Slower gain changes, fewer artifacts
    pub fn gentle() -> Self {
        Self {
            attack: 0.97,
            release: 0.995,
            band_smoothing: 0.03,
            vad_threshold: 0.9,
            ..Self::default()
        }
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> DenoiseResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> DenoiseResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every field's range
    pub fn validate(&self) -> DenoiseResult<()> {
        let coefficients = [
            ("attack", self.attack),
            ("release", self.release),
            ("band_smoothing", self.band_smoothing),
            ("energy_smoothing", self.energy_smoothing),
            ("activity_floor", self.activity_floor),
        ];
        for (name, value) in coefficients {
            if !(0.0..1.0).contains(&value) {
                return Err(DenoiseError::InvalidConfig(format!(
                    "{name} must be in [0, 1), got {value}"
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.vad_threshold) {
            return Err(DenoiseError::InvalidConfig(format!(
                "vad_threshold must be in [0, 1], got {}",
                self.vad_threshold
            )));
        }
        if !(self.noise_floor.is_finite() && self.noise_floor > 0.0) {
            return Err(DenoiseError::InvalidConfig(format!(
                "noise_floor must be positive, got {}",
                self.noise_floor
            )));
        }
        if self.activity_floor > 0.5 {
            return Err(DenoiseError::InvalidConfig(format!(
                "activity_floor must be <= 0.5, got {}",
                self.activity_floor
            )));
        }
        if self.release < self.attack {
            return Err(DenoiseError::InvalidConfig(format!(
                "release ({}) must be >= attack ({})",
                self.release, self.attack
            )));
        }

        Ok(())
    }
}
