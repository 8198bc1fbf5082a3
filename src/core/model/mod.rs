//! Speech model abstractions
//!
//! The gateway never synthesizes audio itself. It talks to an external
//! Bark-style model through two traits:
//!
//! - [`ModelLoader`] performs the one-time, expensive `preload` of the model
//!   stages and hands back a ready [`SpeechModel`].
//! - [`SpeechModel`] turns text plus a voice preset into an [`AudioResult`].
//!
//! [`ModelGate`] wraps a loader and guarantees the load runs at most once per
//! process, no matter how many requests race for it.

pub mod gate;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::core::audio::AudioResult;

pub use gate::{LoadedModel, ModelGate, ModelState};
pub use remote::{RemoteBackendOptions, RemoteModel, RemoteModelLoader};

/// Output sample rate of the Bark codec stage (Hz)
pub const BARK_SAMPLE_RATE: u32 = 24_000;

/// Errors raised while loading or invoking the speech model.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The model could not be loaded; synthesis is not possible yet
    #[error("Models unavailable: {0}")]
    Unavailable(String),

    /// The model rejected or failed a synthesis call (e.g. unknown voice preset)
    #[error("{0}")]
    Synthesis(String),

    /// The model backend could not be reached
    #[error("Model backend request failed: {0}")]
    Transport(String),

    /// The model backend answered with something that is not audio
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    /// Synthesis did not finish within the configured bound
    #[error("Audio generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Invalid model or backend configuration
    #[error("Invalid model configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Which sub-models to load and at what size/acceleration tier.
///
/// Field names follow the keyword arguments of Bark's `preload_models`, so the
/// struct serializes directly into the backend's preload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    pub text_use_gpu: bool,
    pub text_use_small: bool,
    pub coarse_use_gpu: bool,
    pub coarse_use_small: bool,
    pub fine_use_gpu: bool,
    pub fine_use_small: bool,
    pub codec_use_gpu: bool,
}

impl Default for PreloadConfig {
    /// CPU-only, reduced-size stages to bound memory.
    fn default() -> Self {
        Self {
            text_use_gpu: false,
            text_use_small: true,
            coarse_use_gpu: false,
            coarse_use_small: true,
            fine_use_gpu: false,
            fine_use_small: true,
            codec_use_gpu: false,
        }
    }
}

impl PreloadConfig {
    /// Returns true if any stage requests hardware acceleration
    pub fn uses_gpu(&self) -> bool {
        self.text_use_gpu || self.coarse_use_gpu || self.fine_use_gpu || self.codec_use_gpu
    }
}

/// Sampling temperatures passed on every synthesis call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Temperature of the semantic (text) stage; lower is more stable
    pub text_temp: f32,
    /// Temperature of the waveform (coarse/fine) stages
    pub waveform_temp: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            text_temp: 0.7,
            waveform_temp: 0.7,
        }
    }
}

/// A loaded speech model.
#[async_trait]
pub trait SpeechModel: Send + Sync {
    /// Generate audio for `text` using the given voice preset.
    ///
    /// Repeated calls with identical inputs may return different samples.
    async fn generate_audio(
        &self,
        text: &str,
        history_prompt: &str,
        params: &GenerationParams,
    ) -> ModelResult<AudioResult>;

    /// Native output sample rate of the model
    fn sample_rate(&self) -> u32;

    /// Whether `generate_audio` may be called from several requests at once.
    ///
    /// Models that are not reentrant get their calls serialized by the caller.
    fn supports_concurrent_generation(&self) -> bool {
        false
    }
}

/// Performs the one-time model load.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Load every model stage described by `config`.
    async fn preload(&self, config: &PreloadConfig) -> ModelResult<Box<dyn SpeechModel>>;
}
