//! Configuration module for the Bark gateway
//!
//! Server configuration comes from environment variables (with `.env` loaded
//! first by `main`) and optionally a YAML file. Priority: YAML > ENV vars >
//! .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Applying YAML overrides on top of the environment
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use bark_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

use crate::core::model::{GenerationParams, PreloadConfig, RemoteBackendOptions};
use crate::core::voices::DEFAULT_VOICE;

/// Rates at or above this disable rate limiting
pub const RATE_LIMIT_DISABLED_THRESHOLD: u32 = 100_000;

/// Model backend and lifecycle settings
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Base URL of the model inference backend
    pub backend_url: String,
    /// Bearer token for the backend (optional)
    pub api_key: Option<String>,
    /// HTTP timeout for each backend request
    /// Default: 600 (loading all stages on CPU is slow)
    pub request_timeout_seconds: u64,
    /// Whether the backend tolerates overlapping generate calls
    /// Default: false (calls are serialized)
    pub concurrent_generation: bool,
    /// Start loading the model as soon as the server boots
    /// Default: true
    pub preload_on_startup: bool,
    /// Stage sizes and acceleration, fixed for the process lifetime
    pub preload: PreloadConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8765".to_string(),
            api_key: None,
            request_timeout_seconds: 600,
            concurrent_generation: false,
            preload_on_startup: true,
            preload: PreloadConfig::default(),
        }
    }
}

/// Zeroize the backend API key when the config is dropped.
impl Drop for ModelConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.api_key {
            key.zeroize();
        }
    }
}

/// Synthesis settings; deployment constants, never per-request
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Voice preset used when a request names none
    pub default_voice: String,
    pub text_temp: f32,
    pub waveform_temp: f32,
    /// Upper bound on one synthesis call in seconds; `None` or 0 disables it
    pub timeout_seconds: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            default_voice: DEFAULT_VOICE.to_string(),
            text_temp: params.text_temp,
            waveform_temp: params.waveform_temp,
            timeout_seconds: Some(300),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    pub model: ModelConfig,
    pub generation: GenerationConfig,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            model: ModelConfig::default(),
            generation: GenerationConfig::default(),
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to defaults; the result is validated.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation fails
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = env::load_from_lookup(|key| std::env::var(key).ok())?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Environment variables (with defaults) form the base, then YAML values
    /// override them. The merged configuration is validated.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let base = env::load_from_lookup(|key| std::env::var(key).ok())?;

        let config = merge::merge_config(base, yaml_config);
        validation::validate(&config)?;

        Ok(config)
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether per-IP rate limiting should be installed
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limit_requests_per_second < RATE_LIMIT_DISABLED_THRESHOLD
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            text_temp: self.generation.text_temp,
            waveform_temp: self.generation.waveform_temp,
        }
    }

    /// Synthesis time bound, if enabled
    pub fn synthesis_timeout(&self) -> Option<Duration> {
        self.generation
            .timeout_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Connection options for the model inference backend
    pub fn backend_options(&self) -> RemoteBackendOptions {
        RemoteBackendOptions {
            base_url: self.model.backend_url.clone(),
            api_key: self.model.api_key.clone(),
            request_timeout: Duration::from_secs(self.model.request_timeout_seconds),
            concurrent_generation: self.model.concurrent_generation,
            ..Default::default()
        }
    }
}
