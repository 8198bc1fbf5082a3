pub mod audio;
pub mod model;
pub mod request;
pub mod synthesis;
pub mod voices;

// Re-export commonly used types for convenience
pub use audio::{AudioError, AudioResult, SampleBuffer, decode_wav, encode_wav};
pub use model::{
    BARK_SAMPLE_RATE, GenerationParams, LoadedModel, ModelError, ModelGate, ModelLoader,
    ModelResult, ModelState, PreloadConfig, RemoteBackendOptions, RemoteModel, RemoteModelLoader,
    SpeechModel,
};
pub use request::{MAX_TEXT_CHARS, SynthesisRequest, ValidationError};
pub use synthesis::SpeechService;
pub use voices::{DEFAULT_VOICE, VOICE_PRESETS};
