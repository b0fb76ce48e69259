//! Per-stream denoiser state and the frame pipeline

use crate::config::DenoiseConfig;
use crate::error::{DenoiseError, DenoiseResult};
use crate::features::BandTrackers;
use crate::smoother::GainSmoother;
use qc_dsp::buffer::try_filled;
use qc_dsp::{
    BandTable, Complex32, FRAME_SIZE, NB_BANDS, PitchBuffer, PitchEstimate, TransformEngine,
    TransformScratch, pcm,
};
use qc_rnn::{GainNetwork, ModelWeights, NB_INPUTS, RnnState};
use std::sync::Arc;

/// Per-frame result beyond the VAD probability
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Speech probability in [0, 1]
    pub vad_probability: f32,
    /// `vad_probability >= vad_threshold`
    pub voice_detected: bool,
    /// Best pitch lag in samples
    pub pitch_lag: usize,
    /// Correlation at the best lag, in [0, 1]
    pub pitch_strength: f32,
}

/// One independent audio stream
///
/// Holds everything that carries over between frames plus the work
/// buffers of the pipeline, so `process_frame` never allocates. Model
/// weights, transform plans and the band table are shared read-only.
///
/// Output is rebuilt by overlap-add at half-frame hops: each call
/// synthesizes the current frame and the frame straddling the previous
/// and current input, both with the current gains. Output therefore
/// trails input by half a frame.
///
/// A call to `process_frame` that returns an error leaves the state as it
/// was.
#[derive(Debug, Clone)]
pub struct DenoiseState {
    config: DenoiseConfig,
    smoother: GainSmoother,
    network: GainNetwork,
    transform: Arc<TransformEngine>,
    bands: Arc<BandTable>,

    /// Current input as float
    input: Vec<f32>,
    /// Time-domain work frame
    frame: Vec<f32>,
    /// Frame straddling the previous and current input
    straddle: Vec<f32>,
    /// Output before saturation
    output: Vec<f32>,
    /// Second half of the previous input
    input_tail: Vec<f32>,
    /// Second half of the previous synthesized frame
    synthesis_tail: Vec<f32>,
    /// Frame spectrum
    spectrum: Vec<Complex32>,
    scratch: TransformScratch,
    /// Band energies of the current frame
    energy: Vec<f32>,
    /// Network input of the last frame
    features: Vec<f32>,
    /// Network gains before smoothing
    raw_gains: Vec<f32>,
    /// Smoothed gain history
    gains: Vec<f32>,

    trackers: BandTrackers,
    rnn: RnnState,
    pitch: PitchBuffer,
    last_pitch: PitchEstimate,
    vad_probability: f32,
    frames_processed: u64,
}

impl DenoiseState {
    /// Stream with default config (`None` = built-in model)
    pub fn new(weights: Option<Arc<ModelWeights>>) -> DenoiseResult<Self> {
        Self::with_config(weights, DenoiseConfig::default())
    }

    /// Stream with its own transform plans and band table
    pub fn with_config(
        weights: Option<Arc<ModelWeights>>,
        config: DenoiseConfig,
    ) -> DenoiseResult<Self> {
        let weights = weights.unwrap_or_else(ModelWeights::builtin);
        let transform = Arc::new(TransformEngine::new(FRAME_SIZE)?);
        let bands = Arc::new(BandTable::standard());
        Self::from_parts(weights, transform, bands, config)
    }

    pub(crate) fn from_parts(
        weights: Arc<ModelWeights>,
        transform: Arc<TransformEngine>,
        bands: Arc<BandTable>,
        config: DenoiseConfig,
    ) -> DenoiseResult<Self> {
        config.validate()?;
        if transform.size() != FRAME_SIZE {
            return Err(DenoiseError::InvalidConfig(format!(
                "transform size {} does not match frame size {FRAME_SIZE}",
                transform.size()
            )));
        }
        if bands.fft_size() != FRAME_SIZE || bands.len() != NB_BANDS {
            return Err(DenoiseError::InvalidConfig(format!(
                "band table ({} bands over {} bins) does not match {NB_BANDS} bands over {FRAME_SIZE}",
                bands.len(),
                bands.fft_size()
            )));
        }

        let network = GainNetwork::new(weights);
        let rnn = network.new_state()?;
        let scratch = transform.make_scratch()?;
        let hop = transform.hop();

        log::debug!(
            "Created denoise stream ({} hidden units, attack {}, release {})",
            network.weights().hidden_size(),
            config.attack,
            config.release
        );

        Ok(Self {
            smoother: GainSmoother::from_config(&config),
            config,
            network,
            transform,
            bands,
            input: try_filled(FRAME_SIZE, 0.0)?,
            frame: try_filled(FRAME_SIZE, 0.0)?,
            straddle: try_filled(FRAME_SIZE, 0.0)?,
            output: try_filled(FRAME_SIZE, 0.0)?,
            input_tail: try_filled(hop, 0.0)?,
            synthesis_tail: try_filled(hop, 0.0)?,
            spectrum: try_filled(FRAME_SIZE, Complex32::new(0.0, 0.0))?,
            scratch,
            energy: try_filled(NB_BANDS, 0.0)?,
            features: try_filled(NB_INPUTS, 0.0)?,
            raw_gains: try_filled(NB_BANDS, 0.0)?,
            gains: try_filled(NB_BANDS, 0.0)?,
            trackers: BandTrackers::try_new()?,
            rnn,
            pitch: PitchBuffer::new(FRAME_SIZE)?,
            last_pitch: PitchEstimate::default(),
            vad_probability: 0.0,
            frames_processed: 0,
        })
    }

    /// Denoise one frame of PCM into `out`, returning the VAD probability
    pub fn process_frame(&mut self, out: &mut [i16], input: &[i16]) -> DenoiseResult<f32> {
        self.process_frame_report(out, input)
            .map(|report| report.vad_probability)
    }

    /// Denoise one frame of PCM into `out`
    ///
    /// `out` holds the half frame that ended with the previous call
    /// followed by the first half of `input`.
    pub fn process_frame_report(
        &mut self,
        out: &mut [i16],
        input: &[i16],
    ) -> DenoiseResult<FrameReport> {
        // Every fallible step past this point works on buffers sized at
        // construction, so a rejected call never reaches them.
        if input.len() != FRAME_SIZE {
            return Err(DenoiseError::BufferMismatch {
                expected: FRAME_SIZE,
                got: input.len(),
            });
        }
        if out.len() != FRAME_SIZE {
            return Err(DenoiseError::BufferMismatch {
                expected: FRAME_SIZE,
                got: out.len(),
            });
        }

        pcm::to_f32(input, &mut self.input)?;

        self.pitch.push_frame(&self.input)?;
        let pitch = self.pitch.analyze()?;

        self.frame.copy_from_slice(&self.input);
        self.transform.apply_window(&mut self.frame)?;
        self.transform
            .forward(&self.frame, &mut self.spectrum, &mut self.scratch)?;
        self.bands.band_energy(&self.spectrum, &mut self.energy)?;

        self.trackers
            .compute_features(&self.energy, pitch, &self.config, &mut self.features)?;
        let vad = self
            .network
            .infer(&self.features, &mut self.rnn, &mut self.raw_gains)?;

        self.smoother.smooth(&self.raw_gains, &mut self.gains)?;
        GainSmoother::apply(&mut self.spectrum, &self.gains, &self.bands)?;

        self.transform
            .inverse(&self.spectrum, &mut self.frame, &mut self.scratch)?;

        let hop = self.transform.hop();
        self.straddle[..hop].copy_from_slice(&self.input_tail);
        self.straddle[hop..].copy_from_slice(&self.input[..hop]);
        self.transform.apply_window(&mut self.straddle)?;
        self.transform
            .forward(&self.straddle, &mut self.spectrum, &mut self.scratch)?;
        GainSmoother::apply(&mut self.spectrum, &self.gains, &self.bands)?;
        self.transform
            .inverse(&self.spectrum, &mut self.straddle, &mut self.scratch)?;

        let (head, tail) = self.output.split_at_mut(hop);
        self.transform
            .overlap_add(&self.synthesis_tail, &self.straddle[..hop], head)?;
        self.transform
            .overlap_add(&self.straddle[hop..], &self.frame[..hop], tail)?;
        pcm::write_saturated(&self.output, out)?;

        self.synthesis_tail.copy_from_slice(&self.frame[hop..]);
        self.input_tail.copy_from_slice(&self.input[hop..]);

        self.trackers
            .commit(&self.energy, &self.features, vad, &self.config);
        self.last_pitch = pitch;
        self.vad_probability = vad;
        self.frames_processed += 1;

        log::trace!(
            "Frame {}: vad {:.3}, pitch lag {} ({:.2})",
            self.frames_processed,
            vad,
            pitch.lag,
            pitch.strength
        );

        Ok(FrameReport {
            vad_probability: vad,
            voice_detected: vad >= self.config.vad_threshold,
            pitch_lag: pitch.lag,
            pitch_strength: pitch.strength,
        })
    }

    /// Return to the freshly created state, keeping model and config
    pub fn reset(&mut self) {
        self.input.fill(0.0);
        self.frame.fill(0.0);
        self.straddle.fill(0.0);
        self.output.fill(0.0);
        self.input_tail.fill(0.0);
        self.synthesis_tail.fill(0.0);
        self.spectrum.fill(Complex32::new(0.0, 0.0));
        self.scratch.reset();
        self.energy.fill(0.0);
        self.features.fill(0.0);
        self.raw_gains.fill(0.0);
        self.gains.fill(0.0);
        self.trackers.reset();
        self.rnn.reset();
        self.pitch.reset();
        self.last_pitch = PitchEstimate::default();
        self.vad_probability = 0.0;
        self.frames_processed = 0;
    }

    /// Replace the tuning; history is kept
    pub fn set_config(&mut self, config: DenoiseConfig) -> DenoiseResult<()> {
        config.validate()?;
        self.smoother = GainSmoother::from_config(&config);
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &DenoiseConfig {
        &self.config
    }

    /// Model this stream runs
    pub fn weights(&self) -> &Arc<ModelWeights> {
        self.network.weights()
    }

    /// Transform plans this stream runs on
    pub fn transform(&self) -> &Arc<TransformEngine> {
        &self.transform
    }

    /// Band table this stream runs on
    pub fn bands(&self) -> &Arc<BandTable> {
        &self.bands
    }

    /// VAD probability of the last frame (0 before any frame)
    pub fn vad_probability(&self) -> f32 {
        self.vad_probability
    }

    /// Smoothed per-band gains applied to the last frame
    pub fn gains(&self) -> &[f32] {
        &self.gains
    }

    /// Network gains of the last frame before smoothing
    pub fn raw_gains(&self) -> &[f32] {
        &self.raw_gains
    }

    /// Feature vector of the last frame
    pub fn features(&self) -> &[f32] {
        &self.features
    }

    /// Running noise/speech estimates
    pub fn trackers(&self) -> &BandTrackers {
        &self.trackers
    }

    /// Recurrent state of the gain network
    pub fn rnn_state(&self) -> &RnnState {
        &self.rnn
    }

    /// Pitch estimate of the last frame
    pub fn last_pitch(&self) -> PitchEstimate {
        self.last_pitch
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}
