//! HTTP request handlers
//!
//! - `api` - Health check endpoint
//! - `generate` - Text-to-speech endpoint returning WAV audio
//! - `voices` - Voice preset listing endpoint

pub mod api;
pub mod generate;
pub mod voices;
