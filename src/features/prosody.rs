//! Pitch, intensity and harmonicity summaries plus pitch-period entropy.

use serde::{Deserialize, Serialize};

use super::stats::{mean, std_dev, Summary};
use crate::engine::{HarmonicityContour, IntensityContour, JitterKind, PitchContour, ShimmerKind};
use crate::error::{AnalysisError, Result};

pub const JITTER_KINDS: [JitterKind; 4] = [
    JitterKind::Local,
    JitterKind::LocalAbsolute,
    JitterKind::Rap,
    JitterKind::Ppq5,
];

pub const SHIMMER_KINDS: [ShimmerKind; 4] = [
    ShimmerKind::Local,
    ShimmerKind::LocalDb,
    ShimmerKind::Apq3,
    ShimmerKind::Apq5,
];

const PPE_TRANSIENT: usize = 5;
const PPE_BINS: usize = 3;
const PPE_RANGE: (f64, f64) = (-1.5, 1.5);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    pub floor_hz: f64,
    pub ceiling_hz: f64,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            floor_hz: 75.0,
            ceiling_hz: 600.0,
        }
    }
}

/// Summary of voiced frames only.
pub fn pitch_summary(contour: &PitchContour) -> Result<Summary> {
    Summary::of(&contour.voiced_frequencies())
}

pub fn intensity_summary(contour: &IntensityContour) -> Result<Summary> {
    Summary::of(&contour.values())
}

/// Lowest and highest voiced frequency, used to bound the point process.
pub fn voiced_range(contour: &PitchContour) -> Result<(f64, f64)> {
    let summary = pitch_summary(contour)?;
    Ok((summary.min, summary.max))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HarmonicityStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Statistics over frames with a defined HNR. The extremes are refined
/// with a parabola through the neighbouring frames when both are defined.
pub fn harmonicity_summary(contour: &HarmonicityContour) -> Result<HarmonicityStats> {
    let defined: Vec<f64> = contour.frames.iter().filter_map(|frame| frame.hnr).collect();
    if defined.is_empty() {
        return Err(AnalysisError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    let values: Vec<Option<f64>> = contour.frames.iter().map(|frame| frame.hnr).collect();
    Ok(HarmonicityStats {
        mean: mean(&defined),
        std: std_dev(&defined),
        min: parabolic_extreme(&values, |a, b| a < b),
        max: parabolic_extreme(&values, |a, b| a > b),
    })
}

fn parabolic_extreme(values: &[Option<f64>], better: impl Fn(f64, f64) -> bool) -> f64 {
    let mut best: Option<(usize, f64)> = None;
    for (idx, value) in values.iter().enumerate() {
        if let Some(v) = value {
            if best.map_or(true, |(_, current)| better(*v, current)) {
                best = Some((idx, *v));
            }
        }
    }
    let Some((idx, y1)) = best else {
        return f64::NAN;
    };
    if idx == 0 || idx + 1 >= values.len() {
        return y1;
    }
    match (values[idx - 1], values[idx + 1]) {
        (Some(y0), Some(y2)) => {
            let curvature = y0 - 2.0 * y1 + y2;
            if curvature.abs() < f64::EPSILON {
                y1
            } else {
                y1 - (y2 - y0).powi(2) / (8.0 * curvature)
            }
        }
        _ => y1,
    }
}

/// Pitch-period entropy of a voiced F0 sequence in Hz.
///
/// F0 is expressed in semitones relative to `mean / √2`, whitened with an
/// order-2 linear predictor, stripped of the filter transient and binned
/// into three one-semitone bins over [-1.5, 1.5]. The result is the base-2
/// Shannon entropy of the occupied bins.
pub fn pitch_period_entropy(f0: &[f64]) -> Result<f64> {
    let voiced: Vec<f64> = f0.iter().copied().filter(|f| *f > 0.0).collect();
    let required = PPE_TRANSIENT + 3;
    if voiced.len() < required {
        return Err(AnalysisError::InsufficientData {
            required,
            actual: voiced.len(),
        });
    }
    let reference = mean(&voiced) / std::f64::consts::SQRT_2;
    let semitones: Vec<f64> = voiced.iter().map(|f| 12.0 * (f / reference).log2()).collect();

    let (a1, a2) = levinson_order2(&semitones).ok_or(AnalysisError::Undefined("ppe"))?;
    let residual: Vec<f64> = (0..semitones.len())
        .map(|n| {
            let x1 = if n >= 1 { semitones[n - 1] } else { 0.0 };
            let x2 = if n >= 2 { semitones[n - 2] } else { 0.0 };
            semitones[n] - a1 * x1 - a2 * x2
        })
        .skip(PPE_TRANSIENT)
        .collect();

    let (low, high) = PPE_RANGE;
    let width = (high - low) / PPE_BINS as f64;
    let mut counts = [0usize; PPE_BINS];
    for value in residual {
        if !(low..=high).contains(&value) {
            continue;
        }
        let bin = (((value - low) / width).floor() as usize).min(PPE_BINS - 1);
        counts[bin] += 1;
    }
    let total: usize = counts.iter().sum();
    if total == 0 {
        return Err(AnalysisError::Undefined("ppe"));
    }
    let entropy = counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total as f64;
            -p * p.log2()
        })
        .sum();
    Ok(entropy)
}

/// Autocorrelation-method predictor `x[n] ≈ a1·x[n-1] + a2·x[n-2]`.
fn levinson_order2(x: &[f64]) -> Option<(f64, f64)> {
    let lag = |k: usize| -> f64 { x.iter().zip(&x[k..]).map(|(a, b)| a * b).sum() };
    let (r0, r1, r2) = (lag(0), lag(1), lag(2));
    if r0 <= 0.0 {
        return None;
    }
    let k1 = r1 / r0;
    let error = r0 * (1.0 - k1 * k1);
    if error <= 0.0 {
        return None;
    }
    let k2 = (r2 - k1 * r1) / error;
    Some((k1 - k2 * k1, k2))
}
