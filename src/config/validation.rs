//! Configuration validation

use url::Url;

use super::ServerConfig;

/// Reject configurations the server cannot start with.
pub(super) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.port == 0 {
        return Err("port must be greater than 0".into());
    }

    if config.host.trim().is_empty() {
        return Err("host cannot be empty".into());
    }

    let url = Url::parse(&config.model.backend_url)
        .map_err(|e| format!("model.backend_url is not a valid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!(
            "model.backend_url must use http or https, got '{}'",
            url.scheme()
        )
        .into());
    }

    if config.model.request_timeout_seconds == 0 {
        return Err("model.request_timeout_seconds must be greater than 0".into());
    }

    if config.generation.default_voice.trim().is_empty() {
        return Err("generation.default_voice cannot be empty".into());
    }

    for (name, temp) in [
        ("text_temp", config.generation.text_temp),
        ("waveform_temp", config.generation.waveform_temp),
    ] {
        if !temp.is_finite() || temp <= 0.0 {
            return Err(format!("generation.{name} must be a positive number, got {temp}").into());
        }
    }

    if config.rate_limit_requests_per_second == 0 {
        return Err("rate_limit_requests_per_second must be greater than 0".into());
    }
    if config.rate_limit_burst_size == 0 {
        return Err("rate_limit_burst_size must be greater than 0".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_bad_backend_url() {
        let mut config = ServerConfig::default();
        config.model.backend_url = "not a url".to_string();
        assert!(validate(&config).is_err());

        config.model.backend_url = "ftp://bark:21".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn test_rejects_non_positive_temperature() {
        let mut config = ServerConfig::default();
        config.generation.text_temp = 0.0;
        assert!(validate(&config).is_err());

        config.generation.text_temp = 0.7;
        config.generation.waveform_temp = f32::NAN;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("waveform_temp"));
    }

    #[test]
    fn test_rejects_empty_voice() {
        let mut config = ServerConfig::default();
        config.generation.default_voice = "  ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_limits() {
        let mut config = ServerConfig::default();
        config.rate_limit_burst_size = 0;
        assert!(validate(&config).is_err());

        let mut config = ServerConfig::default();
        config.port = 0;
        assert!(validate(&config).is_err());

        let mut config = ServerConfig::default();
        config.model.request_timeout_seconds = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_synthesis_timeout_is_allowed() {
        let mut config = ServerConfig::default();
        config.generation.timeout_seconds = Some(0);
        assert!(validate(&config).is_ok());
    }
}
