//! Speech service: gate + generation parameters + call discipline

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::audio::AudioResult;
use crate::core::model::{
    GenerationParams, LoadedModel, ModelError, ModelGate, ModelLoader, ModelResult, PreloadConfig,
};
use crate::core::request::SynthesisRequest;

/// Runs synthesis requests against the lazily loaded model.
///
/// Calls into a model that is not reentrant are serialized. The optional
/// timeout bounds the whole call, including the wait for the generation lock.
pub struct SpeechService {
    gate: ModelGate,
    params: GenerationParams,
    timeout: Option<Duration>,
    generation_lock: Mutex<()>,
}

impl SpeechService {
    pub fn new(
        loader: Arc<dyn ModelLoader>,
        preload: PreloadConfig,
        params: GenerationParams,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            gate: ModelGate::new(loader, preload),
            params,
            timeout,
            generation_lock: Mutex::new(()),
        }
    }

    pub fn gate(&self) -> &ModelGate {
        &self.gate
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// See [`ModelGate::ensure_ready`]
    pub async fn ensure_ready(&self) -> ModelResult<Arc<LoadedModel>> {
        self.gate.ensure_ready().await
    }

    /// Generate audio for an already validated request.
    pub async fn synthesize(
        &self,
        model: &LoadedModel,
        request: &SynthesisRequest,
    ) -> ModelResult<AudioResult> {
        let generation = async {
            let _guard = if model.model().supports_concurrent_generation() {
                None
            } else {
                let guard = self.generation_lock.lock().await;
                debug!("Acquired generation lock");
                Some(guard)
            };

            model
                .model()
                .generate_audio(&request.text, &request.voice, &self.params)
                .await
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, generation)
                .await
                .map_err(|_| ModelError::Timeout(limit))?,
            None => generation.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::SampleBuffer;
    use crate::core::model::SpeechModel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records the highest number of overlapping generate calls
    struct OverlapModel {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        delay: Duration,
        reentrant: bool,
    }

    #[async_trait]
    impl SpeechModel for OverlapModel {
        async fn generate_audio(
            &self,
            text: &str,
            _history_prompt: &str,
            params: &GenerationParams,
        ) -> ModelResult<AudioResult> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            let samples = vec![params.text_temp; text.len()];
            Ok(AudioResult::mono(SampleBuffer::Float32(samples), 24_000))
        }

        fn sample_rate(&self) -> u32 {
            24_000
        }

        fn supports_concurrent_generation(&self) -> bool {
            self.reentrant
        }
    }

    struct OverlapLoader {
        peak: Arc<AtomicUsize>,
        delay: Duration,
        reentrant: bool,
    }

    #[async_trait]
    impl ModelLoader for OverlapLoader {
        async fn preload(&self, _config: &PreloadConfig) -> ModelResult<Box<dyn SpeechModel>> {
            Ok(Box::new(OverlapModel {
                active: Arc::new(AtomicUsize::new(0)),
                peak: Arc::clone(&self.peak),
                delay: self.delay,
                reentrant: self.reentrant,
            }))
        }
    }

    fn service(reentrant: bool, delay: Duration, timeout: Option<Duration>) -> (Arc<SpeechService>, Arc<AtomicUsize>) {
        let peak = Arc::new(AtomicUsize::new(0));
        let loader = Arc::new(OverlapLoader {
            peak: Arc::clone(&peak),
            delay,
            reentrant,
        });
        let service = SpeechService::new(
            loader,
            PreloadConfig::default(),
            GenerationParams::default(),
            timeout,
        );
        (Arc::new(service), peak)
    }

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest {
            text: text.to_string(),
            voice: "v2/en_speaker_6".to_string(),
        }
    }

    async fn run_concurrently(service: &Arc<SpeechService>, count: usize) {
        let handles: Vec<_> = (0..count)
            .map(|_| {
                let service = Arc::clone(service);
                tokio::spawn(async move {
                    let model = service.ensure_ready().await.unwrap();
                    service.synthesize(&model, &request("hello")).await.unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_non_reentrant_model_is_serialized() {
        let (service, peak) = service(false, Duration::from_millis(20), None);
        run_concurrently(&service, 6).await;
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reentrant_model_runs_concurrently() {
        let (service, peak) = service(true, Duration::from_millis(50), None);
        run_concurrently(&service, 6).await;
        assert!(peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_generation_params_reach_model() {
        let (service, _) = service(false, Duration::ZERO, None);
        let model = service.ensure_ready().await.unwrap();
        let audio = service.synthesize(&model, &request("abc")).await.unwrap();

        assert_eq!(audio.samples, SampleBuffer::Float32(vec![0.7, 0.7, 0.7]));
    }

    #[tokio::test]
    async fn test_timeout_bounds_generation() {
        let (service, _) = service(
            false,
            Duration::from_millis(200),
            Some(Duration::from_millis(20)),
        );
        let model = service.ensure_ready().await.unwrap();

        let result = service.synthesize(&model, &request("slow")).await;
        assert!(matches!(result, Err(ModelError::Timeout(_))));
        assert!(service.gate().is_ready());
    }

    /// A request queued behind a long generation times out while waiting
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_timeout_covers_wait_for_generation_lock() {
        let (service, peak) = service(
            false,
            Duration::from_millis(150),
            Some(Duration::from_millis(250)),
        );
        let model = service.ensure_ready().await.unwrap();

        let first_request = request("first");
        let second_request = request("second");
        let (first, second) = tokio::join!(
            service.synthesize(&model, &first_request),
            service.synthesize(&model, &second_request),
        );

        let results = [first, second];
        let completed = results.iter().filter(|r| r.is_ok()).count();
        let timed_out = results
            .iter()
            .filter(|r| matches!(r, Err(ModelError::Timeout(_))))
            .count();
        assert_eq!(completed, 1);
        assert_eq!(timed_out, 1);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(service.gate().is_ready());
    }
}
