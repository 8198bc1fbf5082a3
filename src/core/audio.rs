//! Audio buffers and WAV (RIFF) encoding
//!
//! Bark produces 32-bit float samples; some backends hand back 16-bit PCM.
//! The WAV container always keeps the sample width the model produced, so
//! encoding is lossless.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

/// MIME type of encoded responses
pub const WAV_CONTENT_TYPE: &str = "audio/wav";

/// Errors raised while encoding or decoding WAV data.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),
}

/// Raw samples in the model's native width.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    /// IEEE float samples, nominally in [-1.0, 1.0]
    Float32(Vec<f32>),
    /// Signed 16-bit PCM
    Int16(Vec<i16>),
}

impl SampleBuffer {
    pub fn len(&self) -> usize {
        match self {
            Self::Float32(samples) => samples.len(),
            Self::Int16(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bits_per_sample(&self) -> u16 {
        match self {
            Self::Float32(_) => 32,
            Self::Int16(_) => 16,
        }
    }

    fn sample_format(&self) -> SampleFormat {
        match self {
            Self::Float32(_) => SampleFormat::Float,
            Self::Int16(_) => SampleFormat::Int,
        }
    }
}

/// Audio produced by one synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioResult {
    /// Interleaved samples
    pub samples: SampleBuffer,
    /// Samples per second per channel
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioResult {
    pub fn mono(samples: SampleBuffer, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    /// Playback duration of the buffer
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() as f64 / self.channels as f64;
        Duration::from_secs_f64(frames / self.sample_rate as f64)
    }
}

/// Encode audio into an in-memory WAV file (RIFF header + little-endian PCM).
///
/// # Errors
/// Fails on a zero sample rate or channel count, or when the sample count is
/// not a whole number of frames.
pub fn encode_wav(audio: &AudioResult) -> Result<Vec<u8>, AudioError> {
    if audio.sample_rate == 0 {
        return Err(AudioError::InvalidFormat(
            "sample rate must be non-zero".to_string(),
        ));
    }
    if audio.channels == 0 {
        return Err(AudioError::InvalidFormat(
            "channel count must be non-zero".to_string(),
        ));
    }
    if audio.samples.len() % audio.channels as usize != 0 {
        return Err(AudioError::InvalidFormat(format!(
            "{} samples do not divide into {} channels",
            audio.samples.len(),
            audio.channels
        )));
    }

    let spec = WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: audio.samples.bits_per_sample(),
        sample_format: audio.samples.sample_format(),
    };

    let data_len = audio.samples.len() * (spec.bits_per_sample as usize / 8);
    let mut cursor = Cursor::new(Vec::with_capacity(data_len + 64));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        match &audio.samples {
            SampleBuffer::Float32(samples) => {
                for &sample in samples {
                    writer.write_sample(sample)?;
                }
            }
            SampleBuffer::Int16(samples) => {
                for &sample in samples {
                    writer.write_sample(sample)?;
                }
            }
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Decode a WAV file holding 32-bit float or 16-bit integer samples.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioResult, AudioError> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => SampleBuffer::Float32(
            reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
        ),
        (SampleFormat::Int, 16) => SampleBuffer::Int16(
            reader
                .samples::<i16>()
                .collect::<Result<Vec<_>, _>>()?,
        ),
        (format, bits) => {
            return Err(AudioError::InvalidFormat(format!(
                "unsupported WAV sample format {format:?} with {bits} bits per sample"
            )));
        }
    };

    Ok(AudioResult {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}
