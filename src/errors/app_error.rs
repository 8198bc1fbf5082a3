use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::core::audio::AudioError;
use crate::core::model::ModelError;
use crate::core::request::ValidationError;

/// Errors surfaced to HTTP clients.
///
/// Every variant renders as `{"error": "<message>"}` with its status code.
#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected before any model work (400)
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The model could not be loaded (503)
    #[error("{0}")]
    ModelUnavailable(String),

    /// The model failed, timed out, or answered with garbage (500)
    #[error("{0}")]
    Synthesis(String),

    /// Generated audio could not be packaged as WAV (500)
    #[error("Failed to encode audio: {0}")]
    Encoding(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Synthesis(_) | AppError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Unavailable(_) => AppError::ModelUnavailable(err.to_string()),
            other => AppError::Synthesis(other.to_string()),
        }
    }
}

impl From<AudioError> for AppError {
    fn from(err: AudioError) -> Self {
        AppError::Encoding(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}
