//! Environment variable loading
//!
//! Every setting has a variable; unset or empty variables keep the default.

use std::str::FromStr;

use super::{GenerationConfig, ModelConfig, ServerConfig};

/// Build a configuration from a variable lookup.
///
/// Takes a closure so tests can supply variables without touching the process
/// environment.
pub(super) fn load_from_lookup<F>(lookup: F) -> Result<ServerConfig, Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let defaults = ServerConfig::default();
    let model_defaults = ModelConfig::default();
    let generation_defaults = GenerationConfig::default();

    let mut preload = model_defaults.preload;
    preload.text_use_gpu = parse_bool(&get, "TEXT_USE_GPU", preload.text_use_gpu)?;
    preload.text_use_small = parse_bool(&get, "TEXT_USE_SMALL", preload.text_use_small)?;
    preload.coarse_use_gpu = parse_bool(&get, "COARSE_USE_GPU", preload.coarse_use_gpu)?;
    preload.coarse_use_small = parse_bool(&get, "COARSE_USE_SMALL", preload.coarse_use_small)?;
    preload.fine_use_gpu = parse_bool(&get, "FINE_USE_GPU", preload.fine_use_gpu)?;
    preload.fine_use_small = parse_bool(&get, "FINE_USE_SMALL", preload.fine_use_small)?;
    preload.codec_use_gpu = parse_bool(&get, "CODEC_USE_GPU", preload.codec_use_gpu)?;

    let model = ModelConfig {
        backend_url: get("MODEL_BACKEND_URL").unwrap_or_else(|| model_defaults.backend_url.clone()),
        api_key: get("MODEL_API_KEY"),
        request_timeout_seconds: parse(
            &get,
            "MODEL_REQUEST_TIMEOUT_SECONDS",
            model_defaults.request_timeout_seconds,
        )?,
        concurrent_generation: parse_bool(
            &get,
            "MODEL_CONCURRENT_GENERATION",
            model_defaults.concurrent_generation,
        )?,
        preload_on_startup: parse_bool(
            &get,
            "PRELOAD_ON_STARTUP",
            model_defaults.preload_on_startup,
        )?,
        preload,
    };

    let timeout_seconds = match get("SYNTHESIS_TIMEOUT_SECONDS") {
        Some(value) => Some(parse_value::<u64>("SYNTHESIS_TIMEOUT_SECONDS", &value)?),
        None => generation_defaults.timeout_seconds,
    };

    let generation = GenerationConfig {
        default_voice: get("DEFAULT_VOICE")
            .unwrap_or_else(|| generation_defaults.default_voice.clone()),
        text_temp: parse(&get, "TEXT_TEMP", generation_defaults.text_temp)?,
        waveform_temp: parse(&get, "WAVEFORM_TEMP", generation_defaults.waveform_temp)?,
        timeout_seconds,
    };

    Ok(ServerConfig {
        host: get("HOST").unwrap_or_else(|| defaults.host.clone()),
        port: parse(&get, "PORT", defaults.port)?,
        model,
        generation,
        cors_allowed_origins: get("CORS_ALLOWED_ORIGINS"),
        rate_limit_requests_per_second: parse(
            &get,
            "RATE_LIMIT_REQUESTS_PER_SECOND",
            defaults.rate_limit_requests_per_second,
        )?,
        rate_limit_burst_size: parse(
            &get,
            "RATE_LIMIT_BURST_SIZE",
            defaults.rate_limit_burst_size,
        )?,
    })
}

fn parse<T, G>(get: &G, key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| format!("Invalid value for {key}: '{value}' ({e})"))
}

/// Accepts true/false, 1/0, yes/no, on/off (case-insensitive)
fn parse_bool<G>(get: &G, key: &str, default: bool) -> Result<bool, String>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(value) = get(key) else {
        return Ok(default);
    };

    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(format!("Invalid value for {key}: '{value}' (expected a boolean)")),
    }
}
