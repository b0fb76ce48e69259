//! qc-rnn: gain estimation network
//!
//! A three-stage network evaluated once per frame:
//!
//! ```text
//! dense  = tanh(W_in  · features    + b_in)
//! rec    = tanh(W_rec · prev_hidden + b_rec)
//! hidden = dense + rec
//! output = sigmoid(W_out · hidden + b_out)
//! ```
//!
//! Outputs `0..NB_BANDS` are per-band gains, output `VAD_OUTPUT` is the
//! voice activity probability.
//!
//! [`ModelWeights`] are immutable and shared through `Arc` by any number of
//! streams. The hidden vector is per-stream and lives in [`RnnState`].

pub mod layer;
pub mod network;
pub mod weights;

mod builtin;
mod error;

pub use error::{RnnError, RnnResult};
pub use layer::LayerWeights;
pub use network::{GainNetwork, RnnState};
pub use weights::ModelWeights;

use qc_dsp::NB_BANDS;

/// Feature vector length
pub const NB_INPUTS: usize = layout::NB_FEATURES;

/// Network outputs: one gain per band plus VAD
pub const NB_OUTPUTS: usize = NB_BANDS + 1;

/// Output unit carrying the VAD probability
pub const VAD_OUTPUT: usize = NB_BANDS;

/// Feature vector layout
pub mod layout {
    use qc_dsp::NB_BANDS;

    /// log10 band energy of the current frame
    pub const ENERGY: usize = 0;
    /// Temporally smoothed log10 band energy
    pub const SMOOTHED_ENERGY: usize = ENERGY + NB_BANDS;
    /// Noise share of tracked noise + speech energy per band
    pub const NOISE_RATIO: usize = SMOOTHED_ENERGY + NB_BANDS;
    /// Correlation at the best pitch lag
    pub const PITCH_STRENGTH: usize = NOISE_RATIO + NB_BANDS;
    /// Best pitch lag scaled to [0, 1] over the search range
    pub const PITCH_LAG: usize = PITCH_STRENGTH + 1;
    /// Total feature count
    pub const NB_FEATURES: usize = PITCH_LAG + 1;
}
