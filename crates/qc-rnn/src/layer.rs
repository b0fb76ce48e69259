//! Shape-checked affine layer parameters

use crate::error::{RnnError, RnnResult};
use ndarray::linalg::general_mat_vec_mul;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Weight matrix (`rows x cols`, row-major) and bias (`rows`) of one stage
#[derive(Debug, Clone, PartialEq)]
pub struct LayerWeights {
    /// Stage name for error reporting
    name: &'static str,
    /// One row per output unit
    weights: Array2<f32>,
    /// One bias per output unit
    bias: Array1<f32>,
}

impl LayerWeights {
    /// Build from flat row-major arrays
    ///
    /// Fails if `weights.len() != rows * cols`, `bias.len() != rows`, or
    /// any parameter is NaN or infinite.
    pub fn from_flat(
        name: &'static str,
        rows: usize,
        cols: usize,
        weights: Vec<f32>,
        bias: Vec<f32>,
    ) -> RnnResult<Self> {
        if bias.len() != rows {
            return Err(RnnError::ShapeMismatch {
                layer: name,
                expected: format!("{rows} biases"),
                got: format!("{} biases", bias.len()),
            });
        }
        if let Some(index) = weights.iter().position(|w| !w.is_finite()) {
            return Err(RnnError::NonFiniteWeight { layer: name, index });
        }
        if let Some(index) = bias.iter().position(|b| !b.is_finite()) {
            return Err(RnnError::NonFiniteWeight {
                layer: name,
                index: weights.len() + index,
            });
        }

        let count = weights.len();
        let weights = Array2::from_shape_vec((rows, cols), weights).map_err(|_| {
            RnnError::ShapeMismatch {
                layer: name,
                expected: format!("{rows}x{cols} = {} weights", rows * cols),
                got: format!("{count} weights"),
            }
        })?;

        Ok(Self {
            name,
            weights,
            bias: Array1::from(bias),
        })
    }

    /// Build from generator functions
    pub fn from_fn(
        name: &'static str,
        rows: usize,
        cols: usize,
        weight: impl Fn(usize, usize) -> f32,
        bias: impl Fn(usize) -> f32,
    ) -> Self {
        Self {
            name,
            weights: Array2::from_shape_fn((rows, cols), |(r, c)| weight(r, c)),
            bias: Array1::from_shape_fn(rows, bias),
        }
    }

    /// Stage name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Output units
    pub fn rows(&self) -> usize {
        self.weights.nrows()
    }

    /// Input units
    pub fn cols(&self) -> usize {
        self.weights.ncols()
    }

    /// Weight matrix
    pub fn weights(&self) -> ArrayView2<'_, f32> {
        self.weights.view()
    }

    /// Bias vector
    pub fn bias(&self) -> ArrayView1<'_, f32> {
        self.bias.view()
    }

    /// `out = W · input + b` without allocating
    pub(crate) fn affine_into(&self, input: &Array1<f32>, out: &mut Array1<f32>) {
        out.assign(&self.bias);
        general_mat_vec_mul(1.0, &self.weights, input, 1.0, out);
    }
}
