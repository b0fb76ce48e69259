//! Model weights shared across streams

use crate::builtin;
use crate::error::{RnnError, RnnResult};
use crate::layer::LayerWeights;
use crate::{NB_INPUTS, NB_OUTPUTS};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Default model, built on first use
static BUILTIN: Lazy<Arc<ModelWeights>> = Lazy::new(|| {
    let model = builtin::model();
    log::debug!(
        "Built-in gain model ready ({} hidden units)",
        model.hidden_size()
    );
    Arc::new(model)
});

/// Immutable parameters of the dense, recurrent and output stages
///
/// Never mutated after construction; share it with `Arc` and read it from
/// any number of threads.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelWeights {
    /// `hidden x NB_INPUTS`
    input: LayerWeights,
    /// `hidden x hidden`
    recurrent: LayerWeights,
    /// `NB_OUTPUTS x hidden`
    output: LayerWeights,
}

impl ModelWeights {
    /// Assemble a model, checking that the stages chain together
    pub fn new(
        input: LayerWeights,
        recurrent: LayerWeights,
        output: LayerWeights,
    ) -> RnnResult<Self> {
        let hidden = input.rows();

        if hidden == 0 {
            return Err(RnnError::ShapeMismatch {
                layer: input.name(),
                expected: "at least 1 hidden unit".into(),
                got: "0".into(),
            });
        }
        expect_shape(&input, hidden, NB_INPUTS)?;
        expect_shape(&recurrent, hidden, hidden)?;
        expect_shape(&output, NB_OUTPUTS, hidden)?;

        Ok(Self::from_layers(input, recurrent, output))
    }

    /// Build from the flat row-major arrays of all three stages
    #[allow(clippy::too_many_arguments)]
    pub fn from_flat(
        hidden: usize,
        input_weights: Vec<f32>,
        input_bias: Vec<f32>,
        recurrent_weights: Vec<f32>,
        recurrent_bias: Vec<f32>,
        output_weights: Vec<f32>,
        output_bias: Vec<f32>,
    ) -> RnnResult<Self> {
        let input = LayerWeights::from_flat("input", hidden, NB_INPUTS, input_weights, input_bias)?;
        let recurrent =
            LayerWeights::from_flat("recurrent", hidden, hidden, recurrent_weights, recurrent_bias)?;
        let output =
            LayerWeights::from_flat("output", NB_OUTPUTS, hidden, output_weights, output_bias)?;

        let model = Self::new(input, recurrent, output)?;
        log::debug!("Loaded gain model ({hidden} hidden units)");
        Ok(model)
    }

    pub(crate) fn from_layers(
        input: LayerWeights,
        recurrent: LayerWeights,
        output: LayerWeights,
    ) -> Self {
        Self {
            input,
            recurrent,
            output,
        }
    }

    /// Shared built-in model
    pub fn builtin() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    /// Hidden units carried between frames
    pub fn hidden_size(&self) -> usize {
        self.input.rows()
    }

    /// Dense input stage
    pub fn input(&self) -> &LayerWeights {
        &self.input
    }

    /// Recurrent stage
    pub fn recurrent(&self) -> &LayerWeights {
        &self.recurrent
    }

    /// Sigmoid output stage
    pub fn output(&self) -> &LayerWeights {
        &self.output
    }
}

fn expect_shape(layer: &LayerWeights, rows: usize, cols: usize) -> RnnResult<()> {
    if layer.rows() == rows && layer.cols() == cols {
        Ok(())
    } else {
        Err(RnnError::ShapeMismatch {
            layer: layer.name(),
            expected: format!("{rows}x{cols}"),
            got: format!("{}x{}", layer.rows(), layer.cols()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zeros(name: &'static str, rows: usize, cols: usize) -> LayerWeights {
        LayerWeights::from_fn(name, rows, cols, |_, _| 0.0, |_| 0.0)
    }

    #[test]
    fn test_builtin_is_shared() {
        let a = ModelWeights::builtin();
        let b = ModelWeights::builtin();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_builtin_passes_validation() {
        let model = ModelWeights::builtin();
        let checked = ModelWeights::new(
            model.input().clone(),
            model.recurrent().clone(),
            model.output().clone(),
        )
        .unwrap();
        assert_eq!(&checked, model.as_ref());
    }

    #[test]
    fn test_rejects_mismatched_stages() {
        let err = ModelWeights::new(
            zeros("input", 8, NB_INPUTS),
            zeros("recurrent", 8, 7),
            zeros("output", NB_OUTPUTS, 8),
        )
        .unwrap_err();
        assert!(matches!(err, RnnError::ShapeMismatch { layer: "recurrent", .. }));

        let err = ModelWeights::new(
            zeros("input", 8, NB_INPUTS - 1),
            zeros("recurrent", 8, 8),
            zeros("output", NB_OUTPUTS, 8),
        )
        .unwrap_err();
        assert!(matches!(err, RnnError::ShapeMismatch { layer: "input", .. }));

        let err = ModelWeights::new(
            zeros("input", 8, NB_INPUTS),
            zeros("recurrent", 8, 8),
            zeros("output", NB_OUTPUTS - 1, 8),
        )
        .unwrap_err();
        assert!(matches!(err, RnnError::ShapeMismatch { layer: "output", .. }));
    }

    #[test]
    fn test_from_flat() {
        let hidden = 4;
        let model = ModelWeights::from_flat(
            hidden,
            vec![0.1; hidden * NB_INPUTS],
            vec![0.0; hidden],
            vec![0.2; hidden * hidden],
            vec![0.0; hidden],
            vec![0.3; NB_OUTPUTS * hidden],
            vec![0.0; NB_OUTPUTS],
        )
        .unwrap();
        assert_eq!(model.hidden_size(), hidden);

        let err = ModelWeights::from_flat(
            hidden,
            vec![0.1; hidden * NB_INPUTS],
            vec![0.0; hidden],
            vec![0.2; hidden * hidden - 1],
            vec![0.0; hidden],
            vec![0.3; NB_OUTPUTS * hidden],
            vec![0.0; NB_OUTPUTS],
        )
        .unwrap_err();
        assert!(matches!(err, RnnError::ShapeMismatch { layer: "recurrent", .. }));
    }
}
