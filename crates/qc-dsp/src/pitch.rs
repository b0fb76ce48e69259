//! Pitch correlation analysis
//!
//! Normalized cross-correlation of the newest frame against lagged copies
//! of itself, searched over a fixed lag range. The strongest lag and its
//! correlation are a periodicity cue for voiced speech.
//!
//! The analyzer needs samples older than the current frame, so
//! [`PitchBuffer`] keeps `PITCH_HISTORY` trailing samples between frames.
//! Missing history (stream start) is silence.

use crate::buffer::try_filled;
use crate::check_len;
use crate::error::{DspError, DspResult};

/// Shortest period searched (1200 Hz @ 48kHz)
pub const PITCH_MIN_PERIOD: usize = 40;

/// Longest period searched (300 Hz @ 48kHz)
pub const PITCH_MAX_PERIOD: usize = 160;

/// Extra history beyond the longest lag
pub const PITCH_PADDING: usize = 32;

/// Samples retained from previous frames
pub const PITCH_HISTORY: usize = PITCH_MAX_PERIOD + PITCH_PADDING;

/// Number of candidate lags
pub const PITCH_LAGS: usize = PITCH_MAX_PERIOD - PITCH_MIN_PERIOD + 1;

/// Result of a lag search
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PitchEstimate {
    /// Best-matching lag in samples (0 before any search)
    pub lag: usize,
    /// Normalized correlation at that lag, clamped to [0, 1]
    pub strength: f32,
}

/// Normalized cross-correlation over `min_lag..=max_lag`
///
/// The analysis window is the last `window_len` samples of `signal`.
/// Samples before the start of `signal` count as zero. A lag whose
/// energy product is zero correlates as 0.
pub fn pitch_correlation(
    signal: &[f32],
    window_len: usize,
    min_lag: usize,
    max_lag: usize,
    xcorr: &mut [f32],
) -> DspResult<()> {
    if min_lag == 0 || min_lag > max_lag {
        return Err(DspError::InvalidLagRange {
            min: min_lag,
            max: max_lag,
        });
    }
    check_len(max_lag - min_lag + 1, xcorr.len())?;

    let start = signal.len() - window_len.min(signal.len());
    let window = &signal[start..];
    let energy: f64 = window.iter().map(|&x| (x as f64) * (x as f64)).sum();

    for (k, out) in xcorr.iter_mut().enumerate() {
        let lag = min_lag + k;
        let mut dot = 0.0f64;
        let mut lagged_energy = 0.0f64;

        for (t, &x) in window.iter().enumerate() {
            let pos = start + t;
            if pos < lag {
                continue;
            }
            let y = signal[pos - lag] as f64;
            dot += x as f64 * y;
            lagged_energy += y * y;
        }

        let denom = (energy * lagged_energy).sqrt();
        *out = if denom > 1e-9 {
            (dot / denom).clamp(-1.0, 1.0) as f32
        } else {
            0.0
        };
    }

    Ok(())
}

/// Pick the strongest lag; ties resolve to the shortest lag
pub fn best_lag(xcorr: &[f32], min_lag: usize) -> PitchEstimate {
    let mut best = PitchEstimate {
        lag: min_lag,
        strength: 0.0,
    };
    let mut best_value = f32::NEG_INFINITY;

    for (k, &value) in xcorr.iter().enumerate() {
        if value > best_value {
            best_value = value;
            best = PitchEstimate {
                lag: min_lag + k,
                strength: value.clamp(0.0, 1.0),
            };
        }
    }

    best
}

/// Rolling `[history | current frame]` buffer for pitch analysis
#[derive(Debug, Clone)]
pub struct PitchBuffer {
    /// Sample buffer, oldest first
    buf: Vec<f32>,
    /// Samples per frame
    frame_size: usize,
    /// Correlation per lag from the last analysis
    xcorr: Vec<f32>,
}

impl PitchBuffer {
    /// Create a silent buffer for `frame_size`-sample frames
    pub fn new(frame_size: usize) -> DspResult<Self> {
        Ok(Self {
            buf: try_filled(PITCH_HISTORY + frame_size, 0.0)?,
            frame_size,
            xcorr: try_filled(PITCH_LAGS, 0.0)?,
        })
    }

    /// Drop the oldest frame's worth of samples and append `frame`
    pub fn push_frame(&mut self, frame: &[f32]) -> DspResult<()> {
        check_len(self.frame_size, frame.len())?;
        self.buf.copy_within(self.frame_size.., 0);
        self.buf[PITCH_HISTORY..].copy_from_slice(frame);
        Ok(())
    }

    /// Search the newest frame for its best lag
    pub fn analyze(&mut self) -> DspResult<PitchEstimate> {
        pitch_correlation(
            &self.buf,
            self.frame_size,
            PITCH_MIN_PERIOD,
            PITCH_MAX_PERIOD,
            &mut self.xcorr,
        )?;
        Ok(best_lag(&self.xcorr, PITCH_MIN_PERIOD))
    }

    /// Correlations from the last analysis
    pub fn correlations(&self) -> &[f32] {
        &self.xcorr
    }

    /// Buffered samples, oldest first
    pub fn samples(&self) -> &[f32] {
        &self.buf
    }

    /// Back to silence
    pub fn reset(&mut self) {
        self.buf.fill(0.0);
        self.xcorr.fill(0.0);
    }
}
