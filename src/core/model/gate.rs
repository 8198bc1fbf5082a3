//! Model lifecycle gate
//!
//! Guards the expensive model load behind concurrent requests:
//!
//! ```text
//!     +----------+   ensure_ready()   +---------+   ok   +-------+
//!     | Unloaded | -----------------> | Loading | -----> | Ready |
//!     +----------+                    +----+----+        +-------+
//!                                          | err
//!                                          v
//!                                     +--------+  ensure_ready() retries
//!                                     | Failed | ----------------------> Loading
//!                                     +--------+
//! ```
//!
//! At most one load is in flight. Callers that arrive while a load runs wait
//! for it and share its outcome; a caller arriving after a failed attempt has
//! completed starts a new one. `Ready` is terminal for the process lifetime.

use arc_swap::ArcSwapOption;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info};

use super::{ModelError, ModelLoader, ModelResult, PreloadConfig, SpeechModel};

/// Lifecycle state of the speech model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModelState {
    /// No load has been attempted yet
    Unloaded = 0,
    /// A load is in flight
    Loading = 1,
    /// The model is loaded and usable
    Ready = 2,
    /// The last load attempt failed; the next caller retries
    Failed = 3,
}

impl ModelState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Loading,
            2 => Self::Ready,
            3 => Self::Failed,
            _ => Self::Unloaded,
        }
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unloaded => write!(f, "unloaded"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A model that finished loading, retained for the rest of the process.
pub struct LoadedModel {
    model: Box<dyn SpeechModel>,
    load_duration: Duration,
}

impl LoadedModel {
    pub fn model(&self) -> &dyn SpeechModel {
        self.model.as_ref()
    }

    pub fn sample_rate(&self) -> u32 {
        self.model.sample_rate()
    }

    /// How long the successful load took
    pub fn load_duration(&self) -> Duration {
        self.load_duration
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("sample_rate", &self.model.sample_rate())
            .field("load_duration", &self.load_duration)
            .finish()
    }
}

/// Outcome bookkeeping, only touched while holding the load lock
#[derive(Default)]
struct LoadSlot {
    last_failure: Option<String>,
}

struct GateInner {
    loader: Arc<dyn ModelLoader>,
    preload: PreloadConfig,
    model: ArcSwapOption<LoadedModel>,
    state: AtomicU8,
    attempts: AtomicU64,
    /// Completed failed attempts; bumped under the load lock
    failures: AtomicU64,
    slot: Arc<Mutex<LoadSlot>>,
}

impl GateInner {
    fn set_state(&self, state: ModelState) {
        self.state.store(state as u8, Ordering::Release);
    }

    async fn load(
        self: Arc<Self>,
        mut slot: OwnedMutexGuard<LoadSlot>,
    ) -> ModelResult<Arc<LoadedModel>> {
        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        self.set_state(ModelState::Loading);

        info!(
            attempt,
            text_use_small = self.preload.text_use_small,
            coarse_use_small = self.preload.coarse_use_small,
            fine_use_small = self.preload.fine_use_small,
            gpu = self.preload.uses_gpu(),
            "Loading speech models..."
        );

        let started = Instant::now();
        match self.loader.preload(&self.preload).await {
            Ok(model) => {
                let loaded = Arc::new(LoadedModel {
                    model,
                    load_duration: started.elapsed(),
                });
                self.model.store(Some(Arc::clone(&loaded)));
                slot.last_failure = None;
                self.set_state(ModelState::Ready);

                info!(
                    attempt,
                    elapsed_ms = loaded.load_duration.as_millis() as u64,
                    sample_rate = loaded.sample_rate(),
                    "Speech models loaded successfully"
                );
                Ok(loaded)
            }
            Err(e) => {
                let message = match e {
                    ModelError::Unavailable(message) => message,
                    other => other.to_string(),
                };
                error!(
                    attempt,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Failed to load models: {}",
                    message
                );

                slot.last_failure = Some(message.clone());
                self.failures.fetch_add(1, Ordering::Release);
                self.set_state(ModelState::Failed);
                Err(ModelError::Unavailable(message))
            }
        }
    }
}

/// Lazy, idempotent, single-slot initialization gate for the speech model.
///
/// Cloning is cheap; clones share the same slot.
#[derive(Clone)]
pub struct ModelGate {
    inner: Arc<GateInner>,
}

impl ModelGate {
    /// Create a gate that will load through `loader` with the fixed `preload` options.
    pub fn new(loader: Arc<dyn ModelLoader>, preload: PreloadConfig) -> Self {
        Self {
            inner: Arc::new(GateInner {
                loader,
                preload,
                model: ArcSwapOption::empty(),
                state: AtomicU8::new(ModelState::Unloaded as u8),
                attempts: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                slot: Arc::new(Mutex::new(LoadSlot::default())),
            }),
        }
    }

    /// Return the loaded model, loading it first if nobody has yet.
    ///
    /// The load itself runs on a detached task that owns the load lock, so a
    /// caller dropped mid-load (client disconnect) neither aborts the load nor
    /// lets a second one start next to it.
    ///
    /// # Errors
    /// [`ModelError::Unavailable`] when the load this call started, or the one
    /// it waited on, failed.
    pub async fn ensure_ready(&self) -> ModelResult<Arc<LoadedModel>> {
        if let Some(model) = self.inner.model.load_full() {
            return Ok(model);
        }

        let failures_seen = self.inner.failures.load(Ordering::Acquire);
        let slot = Arc::clone(&self.inner.slot).lock_owned().await;

        if let Some(model) = self.inner.model.load_full() {
            debug!("Speech models became ready while waiting for the load lock");
            return Ok(model);
        }

        if self.inner.failures.load(Ordering::Acquire) != failures_seen {
            // The load this caller queued behind has failed; share its outcome
            let message = slot
                .last_failure
                .clone()
                .unwrap_or_else(|| "model load failed".to_string());
            return Err(ModelError::Unavailable(message));
        }

        let inner = Arc::clone(&self.inner);
        match tokio::spawn(inner.load(slot)).await {
            Ok(result) => result,
            Err(e) => {
                self.inner.set_state(ModelState::Failed);
                error!("Model load task aborted: {}", e);
                Err(ModelError::Unavailable(format!("model load task aborted: {e}")))
            }
        }
    }

    /// Whether a usable model is loaded. Never triggers a load.
    pub fn is_ready(&self) -> bool {
        self.inner.model.load().is_some()
    }

    pub fn state(&self) -> ModelState {
        ModelState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Number of load attempts started so far
    pub fn load_attempts(&self) -> u64 {
        self.inner.attempts.load(Ordering::Acquire)
    }

    pub fn preload_config(&self) -> &PreloadConfig {
        &self.inner.preload
    }
}

impl fmt::Debug for ModelGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelGate")
            .field("state", &self.state())
            .field("load_attempts", &self.load_attempts())
            .field("preload", &self.inner.preload)
            .finish()
    }
}
