//! qc-denoise: real-time single-channel speech denoiser
//!
//! Processes one 480-sample frame (10ms @ 48kHz) of 16-bit PCM per call:
//!
//! ```text
//! PCM -> window -> FFT -> band energy (+ pitch) -> features -> gain network
//!     -> gain smoothing -> per-bin gains -> inverse FFT -> overlap-add
//!     -> saturate -> PCM
//! ```
//!
//! Output trails input by half a frame. Each call also returns the
//! frame's voice activity probability.
//!
//! ## Usage
//!
//! ```no_run
//! use qc_denoise::{DenoiseState, FRAME_SIZE};
//!
//! let mut stream = DenoiseState::new(None)?;
//! let input = [0i16; FRAME_SIZE];
//! let mut output = [0i16; FRAME_SIZE];
//! let vad = stream.process_frame(&mut output, &input)?;
//! # let _ = vad;
//! # Ok::<(), qc_denoise::DenoiseError>(())
//! ```
//!
//! Many streams over one model share it through [`DenoiseEngine`].

pub mod config;
pub mod engine;
pub mod features;
pub mod smoother;
pub mod state;

mod error;

pub use config::DenoiseConfig;
pub use engine::DenoiseEngine;
pub use error::{DenoiseError, DenoiseResult};
pub use features::BandTrackers;
pub use smoother::GainSmoother;
pub use state::{DenoiseState, FrameReport};

pub use qc_dsp::{FRAME_SIZE, NB_BANDS, SAMPLE_RATE};
pub use qc_rnn::ModelWeights;
