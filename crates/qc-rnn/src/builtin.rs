//! Built-in gain model
//!
//! A small hand-set network used when no trained weights are supplied.
//! Each band unit opens with band level and closes with the band's noise
//! share; the voicing unit follows overall level and pitch strength.

use crate::layer::LayerWeights;
use crate::layout::{ENERGY, NOISE_RATIO, PITCH_STRENGTH, SMOOTHED_ENERGY};
use crate::weights::ModelWeights;
use crate::{NB_INPUTS, NB_OUTPUTS, VAD_OUTPUT};
use qc_dsp::NB_BANDS;

/// log10 band energy at which a band unit sits at zero
const GATE_LEVEL: f32 = 7.0;

/// Hidden unit tracking voicing
const VOICING_UNIT: usize = NB_BANDS;

/// Hidden unit tracking mean noise share
const NOISE_UNIT: usize = NB_BANDS + 1;

/// Hidden units
pub(crate) const HIDDEN: usize = NB_BANDS + 2;

const BAND_MEAN: f32 = 1.0 / NB_BANDS as f32;

fn input_weight(unit: usize, feature: usize) -> f32 {
    match unit {
        b if b < NB_BANDS => {
            if feature == ENERGY + b || feature == SMOOTHED_ENERGY + b {
                0.5
            } else if feature == NOISE_RATIO + b {
                -2.0
            } else {
                0.0
            }
        }
        VOICING_UNIT => {
            if (ENERGY..ENERGY + NB_BANDS).contains(&feature) {
                BAND_MEAN
            } else if feature == PITCH_STRENGTH {
                2.0
            } else {
                0.0
            }
        }
        _ => {
            if (NOISE_RATIO..NOISE_RATIO + NB_BANDS).contains(&feature) {
                BAND_MEAN
            } else {
                0.0
            }
        }
    }
}

fn input_bias(unit: usize) -> f32 {
    match unit {
        b if b < NB_BANDS => -GATE_LEVEL,
        VOICING_UNIT => -GATE_LEVEL - 1.0,
        _ => 0.0,
    }
}

fn output_weight(out: usize, unit: usize) -> f32 {
    if out < NB_BANDS {
        if unit == out { 4.0 } else { 0.0 }
    } else if unit == VOICING_UNIT {
        4.0
    } else if unit == NOISE_UNIT {
        -2.0
    } else {
        0.0
    }
}

pub(crate) fn model() -> ModelWeights {
    let input = LayerWeights::from_fn("input", HIDDEN, NB_INPUTS, input_weight, input_bias);
    let recurrent = LayerWeights::from_fn(
        "recurrent",
        HIDDEN,
        HIDDEN,
        |r, c| if r == c { 0.5 } else { 0.0 },
        |_| 0.0,
    );
    let output = LayerWeights::from_fn("output", NB_OUTPUTS, HIDDEN, output_weight, |out| {
        if out == VAD_OUTPUT { 0.0 } else { 1.0 }
    });

    ModelWeights::from_layers(input, recurrent, output)
}
