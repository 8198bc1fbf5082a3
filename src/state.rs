use std::sync::Arc;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::model::{ModelLoader, ModelResult, RemoteModelLoader};
use crate::core::synthesis::SpeechService;

/// Shared application state handed to every handler.
pub struct AppState {
    pub config: ServerConfig,
    pub speech: SpeechService,
}

impl AppState {
    /// Build state backed by the configured remote inference backend.
    ///
    /// Nothing is loaded here; the model gate stays unloaded until the first
    /// request or the startup preload.
    pub fn new(config: ServerConfig) -> ModelResult<Arc<Self>> {
        let loader = RemoteModelLoader::new(config.backend_options())?;
        info!(backend = %config.model.backend_url, "Using remote model backend");
        Ok(Self::with_loader(config, Arc::new(loader)))
    }

    /// Build state around any model loader.
    pub fn with_loader(config: ServerConfig, loader: Arc<dyn ModelLoader>) -> Arc<Self> {
        let speech = SpeechService::new(
            loader,
            config.model.preload,
            config.generation_params(),
            config.synthesis_timeout(),
        );
        Arc::new(Self { config, speech })
    }

    /// Whether the speech model is loaded. Never triggers a load.
    pub fn models_loaded(&self) -> bool {
        self.speech.gate().is_ready()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("address", &self.config.address())
            .field("model", self.speech.gate())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_starts_unloaded() {
        let state = AppState::new(ServerConfig::default()).unwrap();
        assert!(!state.models_loaded());
        assert_eq!(state.speech.gate().load_attempts(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_backend_url() {
        let mut config = ServerConfig::default();
        config.model.backend_url = "not a url".to_string();
        assert!(AppState::new(config).is_err());
    }

    #[test]
    fn test_generation_settings_flow_into_service() {
        let mut config = ServerConfig::default();
        config.generation.text_temp = 0.4;
        let state = AppState::new(config).unwrap();
        assert_eq!(state.speech.params().text_temp, 0.4);
    }
}
