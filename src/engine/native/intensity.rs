use std::f64::consts::PI;

use crate::engine::{IntensityContour, IntensityFrame};
use crate::error::{AnalysisError, Result};
use crate::types::AudioData;

/// Squared auditory threshold (2e-5 Pa) used as the 0 dB reference.
const REFERENCE_POWER: f64 = 4.0e-10;
const MIN_POWER: f64 = 1.0e-30;
const WINDOW_PERIODS: f64 = 3.2;
const STEP_PERIODS: f64 = 0.8;

pub(super) fn intensity_contour(audio: &AudioData, min_pitch_hz: f64) -> Result<IntensityContour> {
    if min_pitch_hz <= 0.0 || audio.sample_rate == 0 {
        return Err(AnalysisError::Engine("invalid intensity parameters".into()));
    }
    let sr = audio.sample_rate as f64;
    let window = ((WINDOW_PERIODS / min_pitch_hz) * sr).round().max(2.0) as usize;
    let hop = ((STEP_PERIODS / min_pitch_hz) * sr).round().max(1.0) as usize;
    if audio.samples.len() < window {
        return Err(AnalysisError::InsufficientData {
            required: window,
            actual: audio.samples.len(),
        });
    }
    let weights = hann(window);
    let weight_sum: f64 = weights.iter().sum();

    let mut frames = Vec::new();
    let mut start = 0;
    while start + window <= audio.samples.len() {
        let frame = &audio.samples[start..start + window];
        let weighted_mean = frame
            .iter()
            .zip(&weights)
            .map(|(&s, w)| s as f64 * w)
            .sum::<f64>()
            / weight_sum;
        let power = frame
            .iter()
            .zip(&weights)
            .map(|(&s, w)| w * (s as f64 - weighted_mean).powi(2))
            .sum::<f64>()
            / weight_sum;
        frames.push(IntensityFrame {
            time: (start as f64 + window as f64 / 2.0) / sr,
            db: 10.0 * (power.max(MIN_POWER) / REFERENCE_POWER).log10(),
        });
        start += hop;
    }

    Ok(IntensityContour {
        time_step: hop as f64 / sr,
        frames,
    })
}

pub(super) fn hann(len: usize) -> Vec<f64> {
    if len < 2 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / (len - 1) as f64).cos())
        .collect()
}
