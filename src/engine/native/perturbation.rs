//! Period and amplitude perturbation measures over a glottal point process.
//!
//! A cycle is the span between two consecutive pulses. Cycles outside the
//! period bounds are dropped, and a perturbation window only counts when
//! every neighbouring pair in it stays within the maximum period (and for
//! shimmer, amplitude) factor.

use std::ops::Range;

use crate::engine::{JitterKind, PerturbationParams, PointProcess, ShimmerKind};
use crate::error::{AnalysisError, Result};
use crate::types::AudioData;

#[derive(Debug, Clone, Copy)]
struct Cycle {
    /// Index of the pulse that opens the cycle.
    start: usize,
    period: f64,
    amplitude: f64,
}

pub(super) fn jitter(points: &PointProcess, kind: JitterKind, params: &PerturbationParams) -> Result<f64> {
    let cycles = cycles(points, params, None);
    let periods: Vec<f64> = cycles.iter().map(|cycle| cycle.period).collect();
    let runs = runs(&cycles, |a, b| ratio_within(a.period, b.period, params.max_period_factor));
    let mean_period = mean(&periods).ok_or(AnalysisError::Undefined("jitter"))?;

    let value = match kind {
        JitterKind::Local => mean_abs_difference(&periods, &runs).map(|d| d / mean_period),
        JitterKind::LocalAbsolute => mean_abs_difference(&periods, &runs),
        JitterKind::Rap => window_deviation(&periods, &runs, 3).map(|d| d / mean_period),
        JitterKind::Ppq5 => window_deviation(&periods, &runs, 5).map(|d| d / mean_period),
    };
    value.ok_or(AnalysisError::Undefined("jitter"))
}

pub(super) fn shimmer(
    audio: &AudioData,
    points: &PointProcess,
    kind: ShimmerKind,
    params: &PerturbationParams,
) -> Result<f64> {
    let cycles: Vec<Cycle> = cycles(points, params, Some(audio))
        .into_iter()
        .filter(|cycle| cycle.amplitude > 0.0)
        .collect();
    let amplitudes: Vec<f64> = cycles.iter().map(|cycle| cycle.amplitude).collect();
    let runs = runs(&cycles, |a, b| {
        ratio_within(a.period, b.period, params.max_period_factor)
            && ratio_within(a.amplitude, b.amplitude, params.max_amplitude_factor)
    });
    let mean_amplitude = mean(&amplitudes).ok_or(AnalysisError::Undefined("shimmer"))?;

    let value = match kind {
        ShimmerKind::Local => mean_abs_difference(&amplitudes, &runs).map(|d| d / mean_amplitude),
        ShimmerKind::LocalDb => mean_db_difference(&amplitudes, &runs),
        ShimmerKind::Apq3 => window_deviation(&amplitudes, &runs, 3).map(|d| d / mean_amplitude),
        ShimmerKind::Apq5 => window_deviation(&amplitudes, &runs, 5).map(|d| d / mean_amplitude),
    };
    value.ok_or(AnalysisError::Undefined("shimmer"))
}

fn cycles(points: &PointProcess, params: &PerturbationParams, audio: Option<&AudioData>) -> Vec<Cycle> {
    points
        .times
        .windows(2)
        .enumerate()
        .filter_map(|(start, pair)| {
            let period = pair[1] - pair[0];
            if period < params.period_floor || period > params.period_ceiling {
                return None;
            }
            let amplitude = audio.map_or(0.0, |audio| peak_amplitude(audio, pair[0], pair[1]));
            Some(Cycle {
                start,
                period,
                amplitude,
            })
        })
        .collect()
}

fn peak_amplitude(audio: &AudioData, from: f64, to: f64) -> f64 {
    let (start, end) = (audio.index_at(from), audio.index_at(to));
    audio.samples[start..end.max(start)]
        .iter()
        .fold(0.0f64, |acc, &s| acc.max((s as f64).abs()))
}

/// Maximal stretches of cycles that share pulses and pass `compatible`.
fn runs(cycles: &[Cycle], compatible: impl Fn(&Cycle, &Cycle) -> bool) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut begin = 0;
    for idx in 1..=cycles.len() {
        let continues = idx < cycles.len()
            && cycles[idx].start == cycles[idx - 1].start + 1
            && compatible(&cycles[idx - 1], &cycles[idx]);
        if !continues {
            if idx > begin {
                runs.push(begin..idx);
            }
            begin = idx;
        }
    }
    runs
}

fn ratio_within(a: f64, b: f64, factor: f64) -> bool {
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    low > 0.0 && high / low <= factor
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn mean_abs_difference(values: &[f64], runs: &[Range<usize>]) -> Option<f64> {
    let diffs: Vec<f64> = runs
        .iter()
        .flat_map(|run| values[run.clone()].windows(2).map(|w| (w[1] - w[0]).abs()))
        .collect();
    mean(&diffs)
}

fn mean_db_difference(values: &[f64], runs: &[Range<usize>]) -> Option<f64> {
    let diffs: Vec<f64> = runs
        .iter()
        .flat_map(|run| {
            values[run.clone()]
                .windows(2)
                .map(|w| (20.0 * (w[1] / w[0]).log10()).abs())
        })
        .collect();
    mean(&diffs)
}

/// Mean absolute deviation of each centre value from the mean of its
/// `width`-point neighbourhood.
fn window_deviation(values: &[f64], runs: &[Range<usize>], width: usize) -> Option<f64> {
    let deviations: Vec<f64> = runs
        .iter()
        .flat_map(|run| {
            values[run.clone()].windows(width).map(move |window| {
                let local_mean = window.iter().sum::<f64>() / width as f64;
                (window[width / 2] - local_mean).abs()
            })
        })
        .collect();
    mean(&deviations)
}
