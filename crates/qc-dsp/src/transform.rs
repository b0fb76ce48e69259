//! Frame transform engine
//!
//! Fixed-length complex FFT pair plus the analysis window:
//! - Forward transform is unnormalized
//! - Inverse transform is scaled by 1/N so `inverse(forward(x)) == x`
//! - Symmetric Hann window, zero at both edges
//! - Half-overlap synthesis: two windowed frames a half frame apart are
//!   summed and divided by their summed window, so unit gain gives back
//!   the input exactly
//!
//! FFT plans (twiddles included) are built once per engine and shared
//! read-only through `Arc`. Per-stream work buffers live in
//! [`TransformScratch`] so the engine itself is never mutated.

use crate::buffer::try_filled;
use crate::error::{DspError, DspResult};
use crate::check_len;
use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Shared forward/inverse transform for one frame length
#[derive(Clone)]
pub struct TransformEngine {
    /// Transform length
    size: usize,
    /// Forward FFT plan
    forward: Arc<dyn Fft<f32>>,
    /// Inverse FFT plan
    inverse: Arc<dyn Fft<f32>>,
    /// Analysis window
    window: Vec<f32>,
    /// `1 / (w[n] + w[n + N/2])` for the first half frame
    overlap_norm: Vec<f32>,
    /// Scratch length required by either plan
    scratch_len: usize,
}

impl fmt::Debug for TransformEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformEngine")
            .field("size", &self.size)
            .field("scratch_len", &self.scratch_len)
            .finish()
    }
}

impl TransformEngine {
    /// Plan transforms and window for `size` samples
    pub fn new(size: usize) -> DspResult<Self> {
        if size < 2 {
            return Err(DspError::InvalidFrameSize(size));
        }

        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        log::debug!("Planned {size}-point transform (scratch {scratch_len})");

        let window = hann_window(size);
        let half = size / 2;
        let overlap_norm = (0..half)
            .map(|n| {
                let sum = window[n] + window[n + half];
                if sum > f32::EPSILON { 1.0 / sum } else { 0.0 }
            })
            .collect();

        Ok(Self {
            size,
            forward,
            inverse,
            window,
            overlap_norm,
            scratch_len,
        })
    }

    /// Transform length
    pub fn size(&self) -> usize {
        self.size
    }

    /// Analysis window coefficients
    pub fn window(&self) -> &[f32] {
        &self.window
    }

    /// Half a frame, the hop between overlapping synthesis frames
    pub fn hop(&self) -> usize {
        self.size / 2
    }

    /// Combine two windowed frames half a frame apart
    ///
    /// `earlier` is the second half of the earlier frame and `later` the
    /// first half of the later one; both cover the same `hop()` samples.
    pub fn overlap_add(&self, earlier: &[f32], later: &[f32], out: &mut [f32]) -> DspResult<()> {
        let hop = self.hop();
        check_len(hop, earlier.len())?;
        check_len(hop, later.len())?;
        check_len(hop, out.len())?;

        for (((y, &a), &b), &norm) in out
            .iter_mut()
            .zip(earlier)
            .zip(later)
            .zip(&self.overlap_norm)
        {
            *y = (a + b) * norm;
        }
        Ok(())
    }

    /// Allocate work buffers for one stream
    pub fn make_scratch(&self) -> DspResult<TransformScratch> {
        Ok(TransformScratch {
            work: try_filled(self.size, Complex32::new(0.0, 0.0))?,
            fft: try_filled(self.scratch_len, Complex32::new(0.0, 0.0))?,
        })
    }

    /// Multiply a time-domain frame by the analysis window
    pub fn apply_window(&self, frame: &mut [f32]) -> DspResult<()> {
        check_len(self.size, frame.len())?;
        for (sample, &w) in frame.iter_mut().zip(&self.window) {
            *sample *= w;
        }
        Ok(())
    }

    /// Unnormalized forward DFT of a real frame
    pub fn forward(
        &self,
        frame: &[f32],
        spectrum: &mut [Complex32],
        scratch: &mut TransformScratch,
    ) -> DspResult<()> {
        check_len(self.size, frame.len())?;
        check_len(self.size, spectrum.len())?;
        self.check_scratch(scratch)?;

        for (bin, &x) in spectrum.iter_mut().zip(frame) {
            *bin = Complex32::new(x, 0.0);
        }
        self.forward.process_with_scratch(spectrum, &mut scratch.fft);
        Ok(())
    }

    /// Inverse DFT scaled by 1/N, real part only
    pub fn inverse(
        &self,
        spectrum: &[Complex32],
        frame: &mut [f32],
        scratch: &mut TransformScratch,
    ) -> DspResult<()> {
        check_len(self.size, spectrum.len())?;
        check_len(self.size, frame.len())?;
        self.check_scratch(scratch)?;

        scratch.work.copy_from_slice(spectrum);
        self.inverse
            .process_with_scratch(&mut scratch.work, &mut scratch.fft);

        let norm = 1.0 / self.size as f32;
        for (sample, bin) in frame.iter_mut().zip(&scratch.work) {
            *sample = bin.re * norm;
        }
        Ok(())
    }

    fn check_scratch(&self, scratch: &TransformScratch) -> DspResult<()> {
        check_len(self.size, scratch.work.len())?;
        if scratch.fft.len() < self.scratch_len {
            return Err(DspError::BufferMismatch {
                expected: self.scratch_len,
                got: scratch.fft.len(),
            });
        }
        Ok(())
    }
}

/// Per-stream transform work buffers
#[derive(Debug, Clone)]
pub struct TransformScratch {
    /// Inverse transform working copy
    work: Vec<Complex32>,
    /// FFT algorithm scratch
    fft: Vec<Complex32>,
}

impl TransformScratch {
    /// Zero all work buffers
    pub fn reset(&mut self) {
        self.work.fill(Complex32::new(0.0, 0.0));
        self.fft.fill(Complex32::new(0.0, 0.0));
    }
}

/// Symmetric Hann window of `size` points
pub fn hann_window(size: usize) -> Vec<f32> {
    let denom = (size.max(2) - 1) as f32;
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / denom;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}
