//! Resample, trim and level a recording before analysis.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{decoder, resample};
use crate::error::{AnalysisError, Result};
use crate::types::AudioData;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessSettings {
    pub target_sample_rate: u32,
    pub silence_threshold_dbfs: f64,
    pub chunk_ms: u32,
    pub target_dbfs: f64,
    pub min_duration_secs: f64,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            target_sample_rate: 16_000,
            silence_threshold_dbfs: -40.0,
            chunk_ms: 10,
            target_dbfs: -20.0,
            min_duration_secs: 0.5,
        }
    }
}

/// Produces the trimmed, levelled signal every later stage works on.
pub trait Preprocessor: Send + Sync {
    fn preprocess(&self, path: &Path) -> Result<AudioData>;
}

#[derive(Debug, Clone, Default)]
pub struct NativePreprocessor {
    settings: PreprocessSettings,
}

impl NativePreprocessor {
    pub fn new(settings: PreprocessSettings) -> Self {
        Self { settings }
    }
}

impl Preprocessor for NativePreprocessor {
    fn preprocess(&self, path: &Path) -> Result<AudioData> {
        let decoded = decoder::decode_audio(path)?;
        prepare(decoded, &self.settings)
    }
}

/// Resample, trim leading and trailing silence, then normalise loudness.
/// Recordings shorter than the minimum duration after trimming are rejected.
pub fn prepare(audio: AudioData, settings: &PreprocessSettings) -> Result<AudioData> {
    let samples = resample::linear_resample(&audio.samples, audio.sample_rate, settings.target_sample_rate)?;
    let resampled = AudioData::new(samples, settings.target_sample_rate);
    let trimmed = trim_silence(&resampled, settings.silence_threshold_dbfs, settings.chunk_ms);
    let duration = trimmed.duration_secs();
    debug!(
        original = audio.duration_secs(),
        trimmed = duration,
        "trimmed silence"
    );
    if duration < settings.min_duration_secs {
        return Err(AnalysisError::TooShort {
            duration,
            minimum: settings.min_duration_secs,
        });
    }
    Ok(match_target_amplitude(trimmed, settings.target_dbfs))
}

/// Loudness relative to digital full scale; silence is negative infinity.
pub fn dbfs(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return f64::NEG_INFINITY;
    }
    let power = samples.iter().map(|&s| (s as f64).powi(2)).sum::<f64>() / samples.len() as f64;
    if power <= 0.0 {
        return f64::NEG_INFINITY;
    }
    10.0 * power.log10()
}

/// Drops whole chunks from both ends while they stay below `threshold_dbfs`.
pub fn trim_silence(audio: &AudioData, threshold_dbfs: f64, chunk_ms: u32) -> AudioData {
    let chunk = ((audio.sample_rate as u64 * chunk_ms.max(1) as u64) / 1000).max(1) as usize;
    let samples = &audio.samples;

    let mut start = 0;
    while start < samples.len() && dbfs(&samples[start..(start + chunk).min(samples.len())]) < threshold_dbfs {
        start += chunk;
    }
    let mut end = samples.len();
    while end > start && dbfs(&samples[end.saturating_sub(chunk).max(start)..end]) < threshold_dbfs {
        end = end.saturating_sub(chunk);
    }
    let start = start.min(samples.len());
    let end = end.max(start);

    AudioData::new(samples[start..end].to_vec(), audio.sample_rate)
}

/// Apply the gain that moves the overall level to `target_dbfs`.
pub fn match_target_amplitude(audio: AudioData, target_dbfs: f64) -> AudioData {
    let current = dbfs(&audio.samples);
    if !current.is_finite() {
        return audio;
    }
    let gain = 10f64.powf((target_dbfs - current) / 20.0) as f32;
    let samples = audio.samples.iter().map(|&s| s * gain).collect();
    AudioData::new(samples, audio.sample_rate)
}
