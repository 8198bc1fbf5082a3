use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// This structure represents the full configuration that can be loaded from a YAML file.
/// All fields are optional to allow partial configuration. Values present here
/// override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5000
///
/// model:
///   backend_url: "http://127.0.0.1:8765"
///   api_key: "backend-token"
///   request_timeout_seconds: 600
///   concurrent_generation: false
///   preload_on_startup: true
///   preload:
///     text_use_gpu: false
///     text_use_small: true
///     coarse_use_gpu: false
///     coarse_use_small: true
///     fine_use_gpu: false
///     fine_use_small: true
///     codec_use_gpu: false
///
/// generation:
///   default_voice: "v2/en_speaker_6"
///   text_temp: 0.7
///   waveform_temp: 0.7
///   timeout_seconds: 300
///
/// security:
///   cors_allowed_origins: "*"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub model: Option<ModelYaml>,
    pub generation: Option<GenerationYaml>,
    pub security: Option<SecurityYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Model backend settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ModelYaml {
    pub backend_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_seconds: Option<u64>,
    pub concurrent_generation: Option<bool>,
    pub preload_on_startup: Option<bool>,
    pub preload: Option<PreloadYaml>,
}

/// Per-stage preload overrides; unset stages keep their environment value
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PreloadYaml {
    pub text_use_gpu: Option<bool>,
    pub text_use_small: Option<bool>,
    pub coarse_use_gpu: Option<bool>,
    pub coarse_use_small: Option<bool>,
    pub fine_use_gpu: Option<bool>,
    pub fine_use_small: Option<bool>,
    pub codec_use_gpu: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GenerationYaml {
    pub default_voice: Option<String>,
    pub text_temp: Option<f32>,
    pub waveform_temp: Option<f32>,
    /// 0 disables the synthesis timeout
    pub timeout_seconds: Option<u64>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    pub rate_limit_requests_per_second: Option<u32>,
    /// Maximum burst size for rate limiting
    pub rate_limit_burst_size: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
