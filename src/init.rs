//! Model preloading outside the request path.
//!
//! This module powers two things:
//!
//! - the `bark-gateway preload` CLI command, which loads the model once through
//!   the configured backend and exits, so deployments can verify the backend
//!   and warm its weights before taking traffic;
//! - the background load started at server boot when `PRELOAD_ON_STARTUP` is
//!   enabled.
//!
//! Typical usage from the CLI:
//!
//! ```text
//! $ MODEL_BACKEND_URL=http://127.0.0.1:8765 bark-gateway preload
//! ```

use anyhow::{Result, anyhow};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::state::AppState;

/// Load the speech model once and report how long it took.
pub async fn run(config: ServerConfig) -> Result<()> {
    let state = AppState::new(config).map_err(|e| anyhow!(e.to_string()))?;
    let gate = state.speech.gate();

    info!(
        backend = %state.config.model.backend_url,
        gpu = gate.preload_config().uses_gpu(),
        "Preloading speech models"
    );

    let model = state
        .speech
        .ensure_ready()
        .await
        .map_err(|e| anyhow!(e.to_string()))?;

    info!(
        elapsed_ms = model.load_duration().as_millis() as u64,
        sample_rate = model.sample_rate(),
        "Speech models ready"
    );

    Ok(())
}

/// Start loading the model in the background.
///
/// A failure is only logged; the next `/generate` request retries the load.
pub fn spawn_startup_preload(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = state.speech.ensure_ready().await {
            warn!("Startup model preload failed, will retry on first request: {}", e);
        }
    })
}
