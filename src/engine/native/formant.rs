//! Burg-LPC formant tracker.
//!
//! Each frame is pre-emphasised, Gaussian-windowed and fitted with an
//! all-pole model of order `2 * max_formants`; formants are the peaks of
//! the model's spectral envelope.

use std::f64::consts::PI;

use crate::audio::resample;
use crate::engine::{FormantContour, FormantFrame, FormantSettings};
use crate::error::{AnalysisError, Result};
use crate::types::AudioData;

const PRE_EMPHASIS_FROM_HZ: f64 = 50.0;
const ENVELOPE_POINTS: usize = 512;
const EDGE_MARGIN_HZ: f64 = 50.0;

pub(super) fn track_formants(audio: &AudioData, settings: &FormantSettings) -> Result<FormantContour> {
    if settings.time_step <= 0.0 || settings.max_formants == 0 {
        return Err(AnalysisError::Engine("invalid formant settings".into()));
    }
    let target_rate = (2.0 * settings.max_formant_hz).round() as u32;
    let resampled = resample::linear_resample(&audio.samples, audio.sample_rate, target_rate)
        .map_err(|err| AnalysisError::Engine(err.to_string()))?;
    let sr = target_rate as f64;
    let signal = pre_emphasize(&resampled, sr);

    let duration = signal.len() as f64 / sr;
    let physical_window = 2.0 * settings.window_length;
    let window_len = (physical_window * sr).round() as usize;
    let order = 2 * settings.max_formants;
    if duration < physical_window || window_len <= order + 1 {
        return Err(AnalysisError::InsufficientData {
            required: window_len.max(order + 2),
            actual: signal.len(),
        });
    }

    let frame_count = ((duration - physical_window) / settings.time_step).floor() as usize + 1;
    let first_center = duration / 2.0 - (frame_count - 1) as f64 * settings.time_step / 2.0;
    let window = gaussian_window(window_len);

    let mut frames = Vec::with_capacity(frame_count);
    let mut buffer = vec![0.0; window_len];
    for idx in 0..frame_count {
        let center = first_center + idx as f64 * settings.time_step;
        let start = ((center - physical_window / 2.0) * sr).round().max(0.0) as usize;
        for (offset, slot) in buffer.iter_mut().enumerate() {
            let sample = signal.get(start + offset).copied().unwrap_or(0.0);
            *slot = sample * window[offset];
        }
        let frequencies = burg(&buffer, order)
            .map(|coefficients| envelope_peaks(&coefficients, sr, settings.max_formants))
            .unwrap_or_default();
        frames.push(FormantFrame {
            time: center,
            frequencies,
        });
    }

    Ok(FormantContour {
        start_time: 0.0,
        end_time: duration,
        time_step: settings.time_step,
        frames,
    })
}

fn pre_emphasize(samples: &[f32], sr: f64) -> Vec<f64> {
    let alpha = (-2.0 * PI * PRE_EMPHASIS_FROM_HZ / sr).exp();
    let mut output = Vec::with_capacity(samples.len());
    let mut previous = 0.0;
    for &sample in samples {
        let current = sample as f64;
        output.push(current - alpha * previous);
        previous = current;
    }
    output
}

fn gaussian_window(len: usize) -> Vec<f64> {
    let mid = (len as f64 - 1.0) / 2.0;
    let edge = (-12.0f64).exp();
    let denom = (len as f64 + 1.0).powi(2);
    (0..len)
        .map(|i| {
            let x = i as f64 - mid;
            ((-48.0 * x * x / denom).exp() - edge) / (1.0 - edge)
        })
        .collect()
}

/// Burg's method. Returns prediction coefficients `a[1..=order]` (index 0
/// unused) such that `x[n] ≈ Σ a[k]·x[n-k]`.
fn burg(data: &[f64], order: usize) -> Option<Vec<f64>> {
    let n = data.len();
    if n <= order + 1 {
        return None;
    }
    let mut wk1: Vec<f64> = data[..n - 1].to_vec();
    let mut wk2: Vec<f64> = data[1..].to_vec();
    let mut d = vec![0.0; order + 1];
    let mut wkm = vec![0.0; order + 1];

    for k in 1..=order {
        let mut num = 0.0;
        let mut denom = 0.0;
        for j in 0..(n - k) {
            num += wk1[j] * wk2[j];
            denom += wk1[j] * wk1[j] + wk2[j] * wk2[j];
        }
        if denom <= f64::MIN_POSITIVE {
            return None;
        }
        d[k] = 2.0 * num / denom;
        for i in 1..k {
            d[i] = wkm[i] - d[k] * wkm[k - i];
        }
        if k == order {
            break;
        }
        wkm[1..=k].copy_from_slice(&d[1..=k]);
        for j in 0..(n - k - 1) {
            wk1[j] -= wkm[k] * wk2[j];
            wk2[j] = wk2[j + 1] - wkm[k] * wk1[j + 1];
        }
    }
    Some(d)
}

/// Peaks of the all-pole envelope `1 / |A(e^{jω})|²`, lowest first.
fn envelope_peaks(coefficients: &[f64], sr: f64, max_formants: usize) -> Vec<f64> {
    let nyquist = sr / 2.0;
    let bin_hz = nyquist / (ENVELOPE_POINTS - 1) as f64;
    let envelope: Vec<f64> = (0..ENVELOPE_POINTS)
        .map(|bin| {
            let omega = PI * bin as f64 / (ENVELOPE_POINTS - 1) as f64;
            let (mut re, mut im) = (1.0, 0.0);
            for (k, a) in coefficients.iter().enumerate().skip(1) {
                re -= a * (omega * k as f64).cos();
                im += a * (omega * k as f64).sin();
            }
            -10.0 * (re * re + im * im).max(f64::MIN_POSITIVE).log10()
        })
        .collect();

    let mut peaks = Vec::new();
    for bin in 1..ENVELOPE_POINTS - 1 {
        let (left, mid, right) = (envelope[bin - 1], envelope[bin], envelope[bin + 1]);
        if mid > left && mid >= right {
            let curvature = left - 2.0 * mid + right;
            let shift = if curvature.abs() > f64::EPSILON {
                0.5 * (left - right) / curvature
            } else {
                0.0
            };
            let frequency = (bin as f64 + shift) * bin_hz;
            if frequency > EDGE_MARGIN_HZ && frequency < nyquist - EDGE_MARGIN_HZ {
                peaks.push(frequency);
            }
        }
        if peaks.len() == max_formants {
            break;
        }
    }
    peaks
}
