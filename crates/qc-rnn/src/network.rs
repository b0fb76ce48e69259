//! Per-frame gain inference

use crate::error::{RnnError, RnnResult};
use crate::weights::ModelWeights;
use crate::{NB_INPUTS, VAD_OUTPUT};
use ndarray::Array1;
use qc_dsp::NB_BANDS;
use qc_dsp::buffer::try_filled;
use std::sync::Arc;

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Zero any NaN left by an overflowing product, returning how many
fn clear_nan(values: &mut Array1<f32>) -> usize {
    let mut cleared = 0;
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = 0.0;
            cleared += 1;
        }
    }
    cleared
}

fn zeros(len: usize) -> RnnResult<Array1<f32>> {
    Ok(Array1::from(try_filled(len, 0.0f32)?))
}

/// Per-stream recurrent state and scratch vectors
///
/// Only `hidden` carries over between frames; the rest is working memory
/// kept here so inference never allocates.
#[derive(Debug, Clone, PartialEq)]
pub struct RnnState {
    input: Array1<f32>,
    dense: Array1<f32>,
    recurrent: Array1<f32>,
    hidden: Array1<f32>,
    output: Array1<f32>,
}

impl RnnState {
    /// Zeroed state for a model with `hidden_size` units
    pub fn try_new(hidden_size: usize) -> RnnResult<Self> {
        Ok(Self {
            input: zeros(NB_INPUTS)?,
            dense: zeros(hidden_size)?,
            recurrent: zeros(hidden_size)?,
            hidden: zeros(hidden_size)?,
            output: zeros(crate::NB_OUTPUTS)?,
        })
    }

    /// Hidden units
    pub fn hidden_size(&self) -> usize {
        self.hidden.len()
    }

    /// Hidden vector carried into the next frame
    pub fn hidden(&self) -> &[f32] {
        self.hidden.as_slice().unwrap_or(&[])
    }

    /// Raw outputs of the last inference (gains then VAD)
    pub fn outputs(&self) -> &[f32] {
        self.output.as_slice().unwrap_or(&[])
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.input.fill(0.0);
        self.dense.fill(0.0);
        self.recurrent.fill(0.0);
        self.hidden.fill(0.0);
        self.output.fill(0.0);
    }
}

/// Gain network bound to a shared model
#[derive(Debug, Clone)]
pub struct GainNetwork {
    weights: Arc<ModelWeights>,
}

impl GainNetwork {
    pub fn new(weights: Arc<ModelWeights>) -> Self {
        Self { weights }
    }

    /// Network over the built-in model
    pub fn builtin() -> Self {
        Self::new(ModelWeights::builtin())
    }

    pub fn weights(&self) -> &Arc<ModelWeights> {
        &self.weights
    }

    /// Fresh state sized for this model
    pub fn new_state(&self) -> RnnResult<RnnState> {
        RnnState::try_new(self.weights.hidden_size())
    }

    /// Run one frame
    ///
    /// Writes `NB_BANDS` gains in [0, 1] and returns the VAD probability.
    /// Non-finite features are treated as 0. Finite weights can still
    /// overflow to `inf - inf`; such activations become 0, which closes
    /// the affected gains. On error nothing is written and `state` is
    /// unchanged.
    pub fn infer(
        &self,
        features: &[f32],
        state: &mut RnnState,
        gains: &mut [f32],
    ) -> RnnResult<f32> {
        if features.len() != NB_INPUTS {
            return Err(RnnError::InputMismatch {
                expected: NB_INPUTS,
                got: features.len(),
            });
        }
        if gains.len() != NB_BANDS {
            return Err(RnnError::InputMismatch {
                expected: NB_BANDS,
                got: gains.len(),
            });
        }
        let hidden_size = self.weights.hidden_size();
        if state.hidden.len() != hidden_size {
            return Err(RnnError::StateMismatch {
                expected: hidden_size,
                got: state.hidden.len(),
            });
        }

        let mut sanitized = 0usize;
        for (dst, &x) in state.input.iter_mut().zip(features) {
            *dst = if x.is_finite() {
                x
            } else {
                sanitized += 1;
                0.0
            };
        }
        if sanitized > 0 {
            log::warn!("Replaced {sanitized} non-finite features with 0");
        }

        let w = &*self.weights;

        w.input().affine_into(&state.input, &mut state.dense);
        state.dense.mapv_inplace(f32::tanh);
        let mut overflowed = clear_nan(&mut state.dense);

        w.recurrent().affine_into(&state.hidden, &mut state.recurrent);
        state.recurrent.mapv_inplace(f32::tanh);
        overflowed += clear_nan(&mut state.recurrent);

        state.hidden.assign(&state.dense);
        state.hidden += &state.recurrent;

        w.output().affine_into(&state.hidden, &mut state.output);
        state.output.mapv_inplace(sigmoid);
        overflowed += clear_nan(&mut state.output);
        state.output.mapv_inplace(|x| x.clamp(0.0, 1.0));

        if overflowed > 0 {
            log::warn!("Cleared {overflowed} overflowed activations");
        }

        for (gain, &out) in gains.iter_mut().zip(state.output.iter()) {
            *gain = out;
        }

        Ok(state.output[VAD_OUTPUT])
    }
}
