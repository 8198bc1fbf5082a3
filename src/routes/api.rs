use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, generate, voices};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router
///
/// # Endpoints
///
/// - `GET /health` - Liveness plus whether the model is loaded
/// - `POST /generate` - Synthesize speech, returns `audio/wav`
/// - `GET /voices` - Supported voice presets
///
/// Cross-cutting layers (CORS, rate limiting, security headers) are applied in
/// `main.rs`.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(api::health_check))
        .route("/generate", post(generate::generate_speech))
        .route("/voices", get(voices::list_voices))
        .layer(TraceLayer::new_for_http())
}
