use crate::engine::{IntensityContour, IntervalKind, TierInterval};
use crate::error::{AnalysisError, Result};

/// Labels every intensity frame as silent or sounding against an absolute
/// threshold, then absorbs silences shorter than `min_pause` and soundings
/// shorter than `min_sounding` into their neighbours.
pub(super) fn segment(
    intensity: &IntensityContour,
    threshold_db: f64,
    min_pause: f64,
    min_sounding: f64,
) -> Result<Vec<TierInterval>> {
    let (Some(first), Some(last)) = (intensity.frames.first(), intensity.frames.last()) else {
        return Err(AnalysisError::InsufficientData {
            required: 1,
            actual: 0,
        });
    };
    let half_step = intensity.time_step / 2.0;
    let start = (first.time - half_step).max(0.0);
    let end = last.time + half_step;

    let mut intervals: Vec<TierInterval> = Vec::new();
    for (idx, frame) in intensity.frames.iter().enumerate() {
        let kind = if frame.db >= threshold_db {
            IntervalKind::Sounding
        } else {
            IntervalKind::Silent
        };
        let frame_start = if idx == 0 { start } else { frame.time - half_step };
        let frame_end = if idx + 1 == intensity.frames.len() {
            end
        } else {
            frame.time + half_step
        };
        push_merged(&mut intervals, frame_start, frame_end, kind);
    }

    let intervals = absorb_short(intervals, IntervalKind::Silent, min_pause);
    Ok(absorb_short(intervals, IntervalKind::Sounding, min_sounding))
}

fn push_merged(intervals: &mut Vec<TierInterval>, start: f64, end: f64, kind: IntervalKind) {
    match intervals.last_mut() {
        Some(previous) if previous.kind == kind => previous.end = end,
        _ => intervals.push(TierInterval { start, end, kind }),
    }
}

fn absorb_short(intervals: Vec<TierInterval>, kind: IntervalKind, min_duration: f64) -> Vec<TierInterval> {
    let count = intervals.len();
    let mut merged = Vec::with_capacity(count);
    for interval in intervals {
        let relabel = count > 1 && interval.kind == kind && interval.duration() < min_duration;
        let kind = if relabel { opposite(kind) } else { interval.kind };
        push_merged(&mut merged, interval.start, interval.end, kind);
    }
    merged
}

fn opposite(kind: IntervalKind) -> IntervalKind {
    match kind {
        IntervalKind::Silent => IntervalKind::Sounding,
        IntervalKind::Sounding => IntervalKind::Silent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IntensityFrame;

    fn contour(levels: &[f64]) -> IntensityContour {
        IntensityContour {
            time_step: 0.01,
            frames: levels
                .iter()
                .enumerate()
                .map(|(idx, &db)| IntensityFrame {
                    time: 0.005 + idx as f64 * 0.01,
                    db,
                })
                .collect(),
        }
    }

    #[test]
    fn long_gap_becomes_a_silence() {
        let mut levels = vec![70.0; 20];
        levels.extend(vec![30.0; 50]);
        levels.extend(vec![70.0; 20]);
        let tier = segment(&contour(&levels), 50.0, 0.3, 0.1).unwrap();
        let kinds: Vec<IntervalKind> = tier.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![IntervalKind::Sounding, IntervalKind::Silent, IntervalKind::Sounding]
        );
        assert!((tier[1].duration() - 0.5).abs() < 1e-9);
        assert!((tier[2].end - 0.9).abs() < 1e-9);
    }

    #[test]
    fn short_dips_are_absorbed() {
        let mut levels = vec![70.0; 20];
        levels.extend(vec![30.0; 5]);
        levels.extend(vec![70.0; 20]);
        let tier = segment(&contour(&levels), 50.0, 0.3, 0.1).unwrap();
        assert_eq!(tier.len(), 1);
        assert_eq!(tier[0].kind, IntervalKind::Sounding);
    }

    #[test]
    fn empty_contour_is_an_error() {
        assert!(segment(&contour(&[]), 50.0, 0.3, 0.1).is_err());
    }
}
