//! In-process speech model doubles
//!
//! `MockLoader` hands out `MockModel`s and records how often it was asked to
//! load. Both can be told to fail or to be slow so tests can drive every
//! branch of the gateway without a real Bark backend.

// Each integration test binary uses a different subset of these helpers
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bark_gateway::core::{
    AudioResult, GenerationParams, ModelError, ModelLoader, ModelResult, PreloadConfig,
    SampleBuffer, SpeechModel,
};

pub const MOCK_SAMPLE_RATE: u32 = 24_000;

/// Voice preset the mock model refuses, like Bark does for unknown presets
pub const BROKEN_VOICE: &str = "v2/broken_speaker";

/// Shared counters for assertions
#[derive(Debug, Default)]
pub struct MockCounters {
    pub loads: AtomicUsize,
    pub generations: AtomicUsize,
    pub active_generations: AtomicUsize,
    pub peak_generations: AtomicUsize,
    pub last_voice: std::sync::Mutex<Option<String>>,
}

impl MockCounters {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn generations(&self) -> usize {
        self.generations.load(Ordering::SeqCst)
    }

    pub fn peak_generations(&self) -> usize {
        self.peak_generations.load(Ordering::SeqCst)
    }

    pub fn last_voice(&self) -> Option<String> {
        self.last_voice.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone)]
pub struct MockLoader {
    pub counters: Arc<MockCounters>,
    /// Number of initial load attempts that fail
    pub fail_loads: usize,
    pub load_delay: Duration,
    pub generate_delay: Duration,
    /// Samples per character of input text
    pub samples_per_char: usize,
}

impl Default for MockLoader {
    fn default() -> Self {
        Self {
            counters: Arc::new(MockCounters::default()),
            fail_loads: 0,
            load_delay: Duration::ZERO,
            generate_delay: Duration::ZERO,
            samples_per_char: 240,
        }
    }
}

impl MockLoader {
    pub fn failing(fail_loads: usize) -> Self {
        Self {
            fail_loads,
            ..Default::default()
        }
    }

    pub fn slow_load(delay: Duration) -> Self {
        Self {
            load_delay: delay,
            ..Default::default()
        }
    }

    pub fn slow_generation(delay: Duration) -> Self {
        Self {
            generate_delay: delay,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ModelLoader for MockLoader {
    async fn preload(&self, _config: &PreloadConfig) -> ModelResult<Box<dyn SpeechModel>> {
        let attempt = self.counters.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.load_delay).await;

        if attempt < self.fail_loads {
            return Err(ModelError::Unavailable(
                "failed to load text model weights".to_string(),
            ));
        }

        Ok(Box::new(MockModel {
            counters: Arc::clone(&self.counters),
            delay: self.generate_delay,
            samples_per_char: self.samples_per_char,
        }))
    }
}

pub struct MockModel {
    counters: Arc<MockCounters>,
    delay: Duration,
    samples_per_char: usize,
}

#[async_trait]
impl SpeechModel for MockModel {
    async fn generate_audio(
        &self,
        text: &str,
        history_prompt: &str,
        _params: &GenerationParams,
    ) -> ModelResult<AudioResult> {
        let active = self.counters.active_generations.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters
            .peak_generations
            .fetch_max(active, Ordering::SeqCst);
        *self.counters.last_voice.lock().unwrap() = Some(history_prompt.to_string());

        tokio::time::sleep(self.delay).await;
        self.counters.active_generations.fetch_sub(1, Ordering::SeqCst);

        if history_prompt == BROKEN_VOICE {
            return Err(ModelError::Synthesis(format!(
                "history prompt {history_prompt} not found"
            )));
        }

        self.counters.generations.fetch_add(1, Ordering::SeqCst);
        let len = text.chars().count() * self.samples_per_char;
        let samples = (0..len)
            .map(|i| ((i as f32) * 0.05).sin() * 0.5)
            .collect();
        Ok(AudioResult::mono(
            SampleBuffer::Float32(samples),
            MOCK_SAMPLE_RATE,
        ))
    }

    fn sample_rate(&self) -> u32 {
        MOCK_SAMPLE_RATE
    }
}
