//! HTTP client for a model inference backend
//!
//! The Bark weights live in a separate inference process. This module drives
//! it over HTTP.
//!
//! # Backend API
//!
//! - `POST {base_url}/preload` with a JSON [`PreloadConfig`]; any 2xx means loaded.
//! - `POST {base_url}/generate` with
//!   `{"text", "history_prompt", "text_temp", "waveform_temp"}`. A 2xx body is
//!   either a WAV file (`Content-Type: audio/wav`) or raw little-endian mono PCM
//!   whose encoding is named by `X-Sample-Format` (`f32le` when absent, or `s16le`).
//! - Errors come back as non-2xx, ideally with an `{"error": "..."}` body.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use zeroize::Zeroizing;

use super::{
    BARK_SAMPLE_RATE, GenerationParams, ModelError, ModelLoader, ModelResult, PreloadConfig,
    SpeechModel,
};
use crate::core::audio::{AudioResult, SampleBuffer, decode_wav};

/// Header naming the encoding of a raw PCM response
pub const SAMPLE_FORMAT_HEADER: &str = "x-sample-format";

/// Longest backend error body carried into an error message
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Connection options for the inference backend.
#[derive(Debug, Clone)]
pub struct RemoteBackendOptions {
    /// Base URL, e.g. `http://127.0.0.1:8765`
    pub base_url: String,
    /// Optional bearer token
    pub api_key: Option<String>,
    /// Per-request HTTP timeout; loading Bark on CPU can take minutes
    pub request_timeout: Duration,
    /// Whether the backend can serve overlapping `generate` calls
    pub concurrent_generation: bool,
    /// Sample rate of raw PCM responses
    pub sample_rate: u32,
}

impl Default for RemoteBackendOptions {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8765".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(600),
            concurrent_generation: false,
            sample_rate: BARK_SAMPLE_RATE,
        }
    }
}

/// Shared HTTP plumbing for the loader and the loaded model
#[derive(Clone)]
struct BackendClient {
    client: reqwest::Client,
    preload_url: Url,
    generate_url: Url,
    api_key: Option<Zeroizing<String>>,
    request_timeout: Duration,
}

impl BackendClient {
    fn new(options: &RemoteBackendOptions) -> ModelResult<Self> {
        let base = Url::parse(options.base_url.trim_end_matches('/')).map_err(|e| {
            ModelError::InvalidConfiguration(format!(
                "invalid backend URL '{}': {e}",
                options.base_url
            ))
        })?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ModelError::InvalidConfiguration(format!(
                "backend URL must use http or https, got: {}",
                base.scheme()
            )));
        }

        let endpoint = |path: &str| {
            Url::parse(&format!("{}/{path}", base.as_str().trim_end_matches('/'))).map_err(|e| {
                ModelError::InvalidConfiguration(format!("invalid backend endpoint {path}: {e}"))
            })
        };

        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| {
                ModelError::InvalidConfiguration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            preload_url: endpoint("preload")?,
            generate_url: endpoint("generate")?,
            api_key: options.api_key.clone().map(Zeroizing::new),
            request_timeout: options.request_timeout,
        })
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &Url,
        body: &T,
    ) -> ModelResult<reqwest::Response> {
        let mut request = self.client.post(url.clone()).json(body);
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {}", key.as_str()));
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(self.request_timeout)
            } else {
                ModelError::Transport(e.to_string())
            }
        })
    }
}

/// Extract a readable message from a failed backend response
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    describe_backend_error(status, &body)
}

fn describe_backend_error(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "detail", "message"]
                .iter()
                .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect());

    if detail.is_empty() {
        format!("backend returned {status}")
    } else {
        detail
    }
}

/// Decode a raw little-endian PCM body
fn decode_raw_pcm(body: &Bytes, format: &str, sample_rate: u32) -> ModelResult<AudioResult> {
    let samples = match format {
        "f32le" => {
            if body.len() % 4 != 0 {
                return Err(ModelError::InvalidResponse(format!(
                    "f32le body of {} bytes is not a whole number of samples",
                    body.len()
                )));
            }
            SampleBuffer::Float32(
                body.chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            )
        }
        "s16le" => {
            if body.len() % 2 != 0 {
                return Err(ModelError::InvalidResponse(format!(
                    "s16le body of {} bytes is not a whole number of samples",
                    body.len()
                )));
            }
            SampleBuffer::Int16(
                body.chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            )
        }
        other => {
            return Err(ModelError::InvalidResponse(format!(
                "unsupported sample format: {other}"
            )));
        }
    };

    Ok(AudioResult::mono(samples, sample_rate))
}

fn is_wav_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    matches!(mime.as_str(), "audio/wav" | "audio/x-wav" | "audio/wave")
}

/// Loads the model by asking the backend to preload its stages.
pub struct RemoteModelLoader {
    backend: BackendClient,
    concurrent_generation: bool,
    sample_rate: u32,
}

impl RemoteModelLoader {
    pub fn new(options: RemoteBackendOptions) -> ModelResult<Self> {
        Ok(Self {
            backend: BackendClient::new(&options)?,
            concurrent_generation: options.concurrent_generation,
            sample_rate: options.sample_rate,
        })
    }
}

#[async_trait]
impl ModelLoader for RemoteModelLoader {
    async fn preload(&self, config: &PreloadConfig) -> ModelResult<Box<dyn SpeechModel>> {
        debug!(url = %self.backend.preload_url, "Requesting backend preload");

        let response = self.backend.post_json(&self.backend.preload_url, config).await?;
        if !response.status().is_success() {
            let status = response.status();
            let message = error_message(response).await;
            warn!(%status, "Backend preload rejected: {}", message);
            return Err(ModelError::Unavailable(message));
        }

        Ok(Box::new(RemoteModel {
            backend: self.backend.clone(),
            concurrent_generation: self.concurrent_generation,
            sample_rate: self.sample_rate,
        }))
    }
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    text: &'a str,
    history_prompt: &'a str,
    text_temp: f32,
    waveform_temp: f32,
}

/// A model loaded inside the inference backend.
pub struct RemoteModel {
    backend: BackendClient,
    concurrent_generation: bool,
    sample_rate: u32,
}

#[async_trait]
impl SpeechModel for RemoteModel {
    async fn generate_audio(
        &self,
        text: &str,
        history_prompt: &str,
        params: &GenerationParams,
    ) -> ModelResult<AudioResult> {
        let body = GenerateBody {
            text,
            history_prompt,
            text_temp: params.text_temp,
            waveform_temp: params.waveform_temp,
        };

        let response = self.backend.post_json(&self.backend.generate_url, &body).await?;
        if !response.status().is_success() {
            return Err(ModelError::Synthesis(error_message(response).await));
        }

        let headers = response.headers();
        let is_wav = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(is_wav_content_type);
        let format = headers
            .get(SAMPLE_FORMAT_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("f32le")
            .trim()
            .to_ascii_lowercase();

        let payload = response
            .bytes()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        if is_wav {
            decode_wav(&payload).map_err(|e| ModelError::InvalidResponse(e.to_string()))
        } else {
            decode_raw_pcm(&payload, &format, self.sample_rate)
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn supports_concurrent_generation(&self) -> bool {
        self.concurrent_generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_scheme() {
        let options = RemoteBackendOptions {
            base_url: "ftp://models.internal".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            RemoteModelLoader::new(options),
            Err(ModelError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rejects_unparseable_url() {
        let options = RemoteBackendOptions {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(RemoteModelLoader::new(options).is_err());
    }

    #[test]
    fn test_endpoints_join_base_path() {
        let options = RemoteBackendOptions {
            base_url: "http://localhost:8765/bark/".to_string(),
            ..Default::default()
        };
        let backend = BackendClient::new(&options).unwrap();
        assert_eq!(
            backend.preload_url.as_str(),
            "http://localhost:8765/bark/preload"
        );
        assert_eq!(
            backend.generate_url.as_str(),
            "http://localhost:8765/bark/generate"
        );
    }

    #[test]
    fn test_decode_raw_f32() {
        let mut raw = Vec::new();
        for sample in [0.5f32, -0.5, 1.0] {
            raw.extend_from_slice(&sample.to_le_bytes());
        }
        let audio = decode_raw_pcm(&Bytes::from(raw), "f32le", 24_000).unwrap();
        assert_eq!(audio.samples, SampleBuffer::Float32(vec![0.5, -0.5, 1.0]));
        assert_eq!(audio.sample_rate, 24_000);
        assert_eq!(audio.channels, 1);
    }

    #[test]
    fn test_decode_raw_s16() {
        let raw: Vec<u8> = [-2i16, 300]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let audio = decode_raw_pcm(&Bytes::from(raw), "s16le", 24_000).unwrap();
        assert_eq!(audio.samples, SampleBuffer::Int16(vec![-2, 300]));
    }

    #[test]
    fn test_decode_raw_rejects_partial_samples() {
        let raw = Bytes::from_static(&[0, 0, 128]);
        assert!(matches!(
            decode_raw_pcm(&raw, "f32le", 24_000),
            Err(ModelError::InvalidResponse(_))
        ));
        assert!(decode_raw_pcm(&raw, "s16le", 24_000).is_err());
        assert!(decode_raw_pcm(&Bytes::new(), "u8", 24_000).is_err());
    }

    #[test]
    fn test_describe_backend_error() {
        assert_eq!(
            describe_backend_error(
                StatusCode::BAD_REQUEST,
                r#"{"error": "Unknown voice preset: v9/xx"}"#
            ),
            "Unknown voice preset: v9/xx"
        );
        assert_eq!(
            describe_backend_error(StatusCode::INTERNAL_SERVER_ERROR, r#"{"detail": "CUDA OOM"}"#),
            "CUDA OOM"
        );
        assert_eq!(
            describe_backend_error(StatusCode::BAD_GATEWAY, "upstream exploded\n"),
            "upstream exploded"
        );
        assert_eq!(
            describe_backend_error(StatusCode::SERVICE_UNAVAILABLE, ""),
            "backend returned 503 Service Unavailable"
        );
    }

    #[test]
    fn test_wav_content_types() {
        assert!(is_wav_content_type("audio/wav"));
        assert!(is_wav_content_type("audio/x-wav; charset=binary"));
        assert!(!is_wav_content_type("application/octet-stream"));
    }
}
