//! Synthesis request validation
//!
//! Validation is a pure step over the raw request body, run before any model
//! work. Checks happen in a fixed order and each failure is its own variant:
//! payload shape, missing `text`, empty `text`, oversized `text`.

use serde_json::{Map, Value};
use thiserror::Error;

/// Maximum length of `text`, in characters, before trimming
pub const MAX_TEXT_CHARS: usize = 500;

/// Reasons a request body is rejected before synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Body missing, not JSON, or not a JSON object
    #[error("Invalid JSON payload")]
    InvalidPayload,

    #[error("Missing 'text' field in request")]
    MissingText,

    /// A known field has the wrong JSON type
    #[error("Field '{0}' must be a string")]
    InvalidField(&'static str),

    #[error("Text cannot be empty")]
    EmptyText,

    #[error("Text too long (max {max} characters)")]
    TextTooLong { max: usize },
}

/// A validated synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    /// Text to speak, as submitted (not trimmed)
    pub text: String,
    /// Voice preset passed through to the model unvalidated
    pub voice: String,
}

impl SynthesisRequest {
    /// Parse and validate a raw JSON request body.
    ///
    /// `voice` falls back to `default_voice` when absent or `null`.
    pub fn from_json_bytes(body: &[u8], default_voice: &str) -> Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| ValidationError::InvalidPayload)?;
        match value {
            Value::Object(fields) => Self::from_fields(&fields, default_voice),
            _ => Err(ValidationError::InvalidPayload),
        }
    }

    fn from_fields(fields: &Map<String, Value>, default_voice: &str) -> Result<Self, ValidationError> {
        let text = match fields.get("text") {
            None => return Err(ValidationError::MissingText),
            Some(Value::String(text)) => text,
            Some(_) => return Err(ValidationError::InvalidField("text")),
        };

        validate_text(text)?;

        let voice = match fields.get("voice") {
            None | Some(Value::Null) => default_voice.to_string(),
            Some(Value::String(voice)) => voice.clone(),
            Some(_) => return Err(ValidationError::InvalidField("voice")),
        };

        Ok(Self {
            text: text.clone(),
            voice,
        })
    }
}

/// Check emptiness (after trimming) and length (before trimming).
pub fn validate_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(ValidationError::TextTooLong {
            max: MAX_TEXT_CHARS,
        });
    }
    Ok(())
}

/// First `max_chars` characters of `text`, for log lines
pub fn preview_text(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
