use crate::engine::{HarmonicityContour, HarmonicityFrame};
use crate::error::{AnalysisError, Result};
use crate::types::AudioData;

const TIME_STEP: f64 = 0.01;
const WINDOW_PERIODS: f64 = 3.0;
const MAX_PITCH_HZ: f64 = 600.0;
const SILENCE_THRESHOLD: f64 = 0.1;
const MAX_CORRELATION: f64 = 1.0 - 1.0e-9;

/// Cross-correlation harmonicity: per frame, the best normalised
/// correlation `r` over the admissible pitch lags becomes
/// `10·log10(r / (1 - r))` dB.
pub(super) fn harmonicity_contour(audio: &AudioData, min_pitch_hz: f64) -> Result<HarmonicityContour> {
    if min_pitch_hz <= 0.0 || audio.sample_rate == 0 {
        return Err(AnalysisError::Engine("invalid harmonicity parameters".into()));
    }
    let sr = audio.sample_rate as f64;
    let window = (WINDOW_PERIODS / min_pitch_hz * sr).round() as usize;
    let hop = (TIME_STEP * sr).round().max(1.0) as usize;
    let min_lag = (sr / MAX_PITCH_HZ).floor().max(1.0) as usize;
    let max_lag = (sr / min_pitch_hz).ceil() as usize;
    if audio.samples.len() < window || window <= max_lag {
        return Err(AnalysisError::InsufficientData {
            required: window.max(max_lag + 1),
            actual: audio.samples.len(),
        });
    }
    let global_peak = audio
        .samples
        .iter()
        .fold(0.0f64, |acc, &s| acc.max((s as f64).abs()));

    let mut frames = Vec::new();
    let mut start = 0;
    while start + window <= audio.samples.len() {
        let frame: Vec<f64> = audio.samples[start..start + window]
            .iter()
            .map(|&s| s as f64)
            .collect();
        let peak = frame.iter().fold(0.0f64, |acc, s| acc.max(s.abs()));
        let hnr = if global_peak <= 0.0 || peak < SILENCE_THRESHOLD * global_peak {
            None
        } else {
            best_correlation(&frame, min_lag, max_lag).map(correlation_to_db)
        };
        frames.push(HarmonicityFrame {
            time: (start as f64 + window as f64 / 2.0) / sr,
            hnr,
        });
        start += hop;
    }

    Ok(HarmonicityContour {
        time_step: hop as f64 / sr,
        frames,
    })
}

fn best_correlation(frame: &[f64], min_lag: usize, max_lag: usize) -> Option<f64> {
    let mean = frame.iter().sum::<f64>() / frame.len() as f64;
    let centered: Vec<f64> = frame.iter().map(|s| s - mean).collect();
    let mut best: Option<f64> = None;
    for lag in min_lag..=max_lag.min(centered.len() - 1) {
        let head = &centered[..centered.len() - lag];
        let tail = &centered[lag..];
        let cross: f64 = head.iter().zip(tail).map(|(a, b)| a * b).sum();
        let energy_head: f64 = head.iter().map(|a| a * a).sum();
        let energy_tail: f64 = tail.iter().map(|b| b * b).sum();
        let norm = (energy_head * energy_tail).sqrt();
        if norm <= f64::MIN_POSITIVE {
            continue;
        }
        let r = cross / norm;
        if best.map_or(true, |current| r > current) {
            best = Some(r);
        }
    }
    best.filter(|r| *r > 0.0)
}

fn correlation_to_db(r: f64) -> f64 {
    let r = r.min(MAX_CORRELATION);
    10.0 * (r / (1.0 - r)).log10()
}
