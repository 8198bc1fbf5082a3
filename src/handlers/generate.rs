//! Text-to-speech endpoint
//!
//! `POST /generate` takes `{"text": "...", "voice": "..."}` and answers with a
//! WAV attachment. The body is read raw so every malformed payload gets the
//! same `Invalid JSON payload` error instead of axum's extractor rejections.
//! A body over the request size limit is reported as text that is too long.

use axum::{
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::audio::{WAV_CONTENT_TYPE, encode_wav};
use crate::core::request::{MAX_TEXT_CHARS, SynthesisRequest, ValidationError, preview_text};
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

/// Longest text prefix written to logs
const LOG_TEXT_PREVIEW_CHARS: usize = 50;

const WAV_CONTENT_DISPOSITION: &str = "attachment; filename=speech.wav";

/// Generate speech for the requested text and return it as a WAV file.
///
/// # Responses
/// - 200 with `audio/wav` body
/// - 400 when the payload fails validation
/// - 503 when the model cannot be loaded
/// - 500 when synthesis or encoding fails
pub async fn generate_speech(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let request_id = Uuid::new_v4();

    let result = match body {
        Ok(body) => generate(&state, &body, request_id).await,
        Err(rejection) => {
            let err = body_rejection_error(&rejection);
            warn!(%request_id, rejection = %rejection, "Rejected generate request: {}", err);
            Err(err.into())
        }
    };

    match result {
        Ok(wav) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, WAV_CONTENT_TYPE),
                (header::CONTENT_DISPOSITION, WAV_CONTENT_DISPOSITION),
            ],
            wav,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Map a body that could not be buffered onto the validation contract.
///
/// Only an oversized body trips the length limit, and its text cannot fit in
/// the character limit either.
fn body_rejection_error(rejection: &BytesRejection) -> ValidationError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::TextTooLong {
            max: MAX_TEXT_CHARS,
        }
    } else {
        ValidationError::InvalidPayload
    }
}

async fn generate(state: &AppState, body: &[u8], request_id: Uuid) -> AppResult<Vec<u8>> {
    let request =
        SynthesisRequest::from_json_bytes(body, &state.config.generation.default_voice)
            .inspect_err(|e| {
                warn!(%request_id, error = %e, "Rejected generate request");
            })?;

    let text_preview = preview_text(&request.text, LOG_TEXT_PREVIEW_CHARS);
    info!(
        %request_id,
        voice = %request.voice,
        text = %text_preview,
        "Generating audio"
    );

    let started = Instant::now();
    let result = synthesize(state, &request).await;

    match &result {
        Ok(wav) => info!(
            %request_id,
            voice = %request.voice,
            bytes = wav.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Audio generated"
        ),
        Err(e) => error!(
            %request_id,
            voice = %request.voice,
            text = %text_preview,
            status = e.status_code().as_u16(),
            "Error generating audio: {}",
            e
        ),
    }

    result
}

async fn synthesize(state: &AppState, request: &SynthesisRequest) -> AppResult<Vec<u8>> {
    let model = state.speech.ensure_ready().await?;
    let audio = state.speech.synthesize(&model, request).await?;
    let wav = encode_wav(&audio).map_err(AppError::from)?;
    Ok(wav)
}
