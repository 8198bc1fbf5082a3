//! Apply YAML overrides on top of an environment-derived configuration

use super::ServerConfig;
use super::yaml::{PreloadYaml, YamlConfig};
use crate::core::model::PreloadConfig;

/// Overlay every value present in `yaml` onto `base`.
pub(super) fn merge_config(mut base: ServerConfig, yaml: YamlConfig) -> ServerConfig {
    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            base.host = host;
        }
        if let Some(port) = server.port {
            base.port = port;
        }
    }

    if let Some(model) = yaml.model {
        if let Some(url) = model.backend_url {
            base.model.backend_url = url;
        }
        if let Some(key) = model.api_key {
            base.model.api_key = Some(key);
        }
        if let Some(secs) = model.request_timeout_seconds {
            base.model.request_timeout_seconds = secs;
        }
        if let Some(concurrent) = model.concurrent_generation {
            base.model.concurrent_generation = concurrent;
        }
        if let Some(preload) = model.preload_on_startup {
            base.model.preload_on_startup = preload;
        }
        if let Some(preload) = model.preload {
            merge_preload(&mut base.model.preload, preload);
        }
    }

    if let Some(generation) = yaml.generation {
        if let Some(voice) = generation.default_voice {
            base.generation.default_voice = voice;
        }
        if let Some(temp) = generation.text_temp {
            base.generation.text_temp = temp;
        }
        if let Some(temp) = generation.waveform_temp {
            base.generation.waveform_temp = temp;
        }
        if let Some(secs) = generation.timeout_seconds {
            base.generation.timeout_seconds = Some(secs);
        }
    }

    if let Some(security) = yaml.security {
        if let Some(origins) = security.cors_allowed_origins {
            base.cors_allowed_origins = Some(origins);
        }
        if let Some(rate) = security.rate_limit_requests_per_second {
            base.rate_limit_requests_per_second = rate;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            base.rate_limit_burst_size = burst;
        }
    }

    base
}

fn merge_preload(target: &mut PreloadConfig, yaml: PreloadYaml) {
    let fields = [
        (&mut target.text_use_gpu, yaml.text_use_gpu),
        (&mut target.text_use_small, yaml.text_use_small),
        (&mut target.coarse_use_gpu, yaml.coarse_use_gpu),
        (&mut target.coarse_use_small, yaml.coarse_use_small),
        (&mut target.fine_use_gpu, yaml.fine_use_gpu),
        (&mut target.fine_use_small, yaml.fine_use_small),
        (&mut target.codec_use_gpu, yaml.codec_use_gpu),
    ];
    for (slot, value) in fields {
        if let Some(value) = value {
            *slot = value;
        }
    }
}
