//! Shared resources for many streams

use crate::config::DenoiseConfig;
use crate::error::DenoiseResult;
use crate::state::DenoiseState;
use qc_dsp::{BandTable, FRAME_SIZE, TransformEngine};
use qc_rnn::ModelWeights;
use std::sync::Arc;

/// Model, transform plans and band table built once and handed to every
/// stream it creates
#[derive(Debug, Clone)]
pub struct DenoiseEngine {
    weights: Arc<ModelWeights>,
    transform: Arc<TransformEngine>,
    bands: Arc<BandTable>,
    config: DenoiseConfig,
}

impl DenoiseEngine {
    pub fn new(weights: Arc<ModelWeights>, config: DenoiseConfig) -> DenoiseResult<Self> {
        config.validate()?;
        let transform = Arc::new(TransformEngine::new(FRAME_SIZE)?);

        log::debug!(
            "Denoise engine ready ({} hidden units)",
            weights.hidden_size()
        );

        Ok(Self {
            weights,
            transform,
            bands: Arc::new(BandTable::standard()),
            config,
        })
    }

    /// Engine over the built-in model with default config
    pub fn with_builtin() -> DenoiseResult<Self> {
        Self::new(ModelWeights::builtin(), DenoiseConfig::default())
    }

    /// New zeroed stream sharing this engine's resources
    pub fn create_stream(&self) -> DenoiseResult<DenoiseState> {
        DenoiseState::from_parts(
            Arc::clone(&self.weights),
            Arc::clone(&self.transform),
            Arc::clone(&self.bands),
            self.config,
        )
    }

    /// New zeroed stream over another model and config, sharing this
    /// engine's transform plans and band table
    pub fn create_stream_with(
        &self,
        weights: Arc<ModelWeights>,
        config: DenoiseConfig,
    ) -> DenoiseResult<DenoiseState> {
        DenoiseState::from_parts(
            weights,
            Arc::clone(&self.transform),
            Arc::clone(&self.bands),
            config,
        )
    }

    pub fn weights(&self) -> &Arc<ModelWeights> {
        &self.weights
    }

    pub fn transform(&self) -> &Arc<TransformEngine> {
        &self.transform
    }

    pub fn bands(&self) -> &Arc<BandTable> {
        &self.bands
    }

    pub fn config(&self) -> &DenoiseConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_engine_is_shareable() {
        assert_send_sync::<DenoiseEngine>();
    }

    #[test]
    fn test_streams_share_weights() {
        let engine = DenoiseEngine::with_builtin().unwrap();
        let a = engine.create_stream().unwrap();
        let b = engine.create_stream().unwrap();
        assert!(Arc::ptr_eq(a.weights(), b.weights()));
        assert!(Arc::ptr_eq(a.weights(), engine.weights()));
    }

    #[test]
    fn test_stream_with_own_model_shares_plans() {
        let engine = DenoiseEngine::with_builtin().unwrap();
        let model = Arc::new(
            ModelWeights::new(
                engine.weights().input().clone(),
                engine.weights().recurrent().clone(),
                engine.weights().output().clone(),
            )
            .unwrap(),
        );

        let stream = engine
            .create_stream_with(Arc::clone(&model), DenoiseConfig::aggressive())
            .unwrap();
        assert!(Arc::ptr_eq(stream.weights(), &model));
        assert_eq!(stream.config(), &DenoiseConfig::aggressive());
        assert!(Arc::ptr_eq(stream.transform(), engine.transform()));
        assert!(Arc::ptr_eq(stream.bands(), engine.bands()));

        let bad = DenoiseConfig {
            attack: 2.0,
            ..DenoiseConfig::default()
        };
        assert!(engine.create_stream_with(model, bad).is_err());
    }

    #[test]
    fn test_streams_inherit_config() {
        let engine =
            DenoiseEngine::new(ModelWeights::builtin(), DenoiseConfig::gentle()).unwrap();
        let stream = engine.create_stream().unwrap();
        assert_eq!(stream.config(), &DenoiseConfig::gentle());
    }
}
