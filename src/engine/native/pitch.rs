use aus::analysis;

use crate::engine::{PitchContour, PitchFrame};
use crate::error::{AnalysisError, Result};
use crate::types::AudioData;

const PERIODS_PER_FRAME: f64 = 3.0;

pub(super) fn track_pitch(audio: &AudioData, floor_hz: f64, ceiling_hz: f64) -> Result<PitchContour> {
    if floor_hz <= 0.0 || ceiling_hz <= floor_hz {
        return Err(AnalysisError::Engine(format!(
            "invalid pitch range {floor_hz}..{ceiling_hz} Hz"
        )));
    }
    let frame_len = frame_length_samples(audio.sample_rate, floor_hz);
    if audio.samples.len() < frame_len {
        return Err(AnalysisError::InsufficientData {
            required: frame_len,
            actual: audio.samples.len(),
        });
    }
    let samples = audio.samples_f64();
    let (timestamps, pitches, voiced_flags, _confidence) = analysis::pyin_pitch_estimator(
        &samples,
        audio.sample_rate,
        floor_hz,
        ceiling_hz,
        frame_len,
    );
    let frequencies = voiced_frequencies(&pitches, &voiced_flags, floor_hz, ceiling_hz);
    if frequencies.is_empty() {
        return Err(AnalysisError::Engine("pitch tracker produced no frames".into()));
    }

    let frames = timed_frames(&timestamps, frequencies);
    let time_step = frame_step(&frames, audio.duration_secs());
    Ok(PitchContour { time_step, frames })
}

/// Pairs each estimate with the frame-centre time the tracker reported.
fn timed_frames(timestamps: &[f64], frequencies: Vec<f64>) -> Vec<PitchFrame> {
    timestamps
        .iter()
        .zip(frequencies)
        .map(|(&time, frequency)| PitchFrame { time, frequency })
        .collect()
}

fn frame_step(frames: &[PitchFrame], duration: f64) -> f64 {
    match (frames.first(), frames.last()) {
        (Some(first), Some(last)) if frames.len() > 1 => (last.time - first.time) / (frames.len() - 1) as f64,
        _ => duration,
    }
}

fn frame_length_samples(sample_rate: u32, floor_hz: f64) -> usize {
    ((sample_rate as f64 * PERIODS_PER_FRAME / floor_hz).ceil() as usize).max(1)
}

fn voiced_frequencies(pitches: &[f64], voiced: &[bool], floor_hz: f64, ceiling_hz: f64) -> Vec<f64> {
    pitches
        .iter()
        .zip(voiced.iter())
        .map(|(&pitch, &flag)| {
            let in_range = pitch.is_finite() && pitch >= floor_hz * 0.95 && pitch <= ceiling_hz * 1.05;
            if flag && in_range {
                pitch
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unvoiced_and_out_of_range_frames_become_zero() {
        let pitches = [120.0, f64::NAN, 130.0, 2000.0];
        let voiced = [true, true, false, true];
        assert_eq!(
            voiced_frequencies(&pitches, &voiced, 75.0, 600.0),
            vec![120.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn frame_covers_three_periods_of_the_floor() {
        assert_eq!(frame_length_samples(16_000, 75.0), 640);
    }

    #[test]
    fn frames_keep_tracker_timestamps() {
        let frames = timed_frames(&[0.0, 0.016, 0.032], vec![120.0, 0.0, 125.0]);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].time, 0.016);
        assert_eq!(frames[2].frequency, 125.0);
        assert!((frame_step(&frames, 1.0) - 0.016).abs() < 1e-12);
        assert_eq!(frame_step(&frames[..1], 0.7), 0.7);
    }

    #[test]
    fn rejects_inverted_range() {
        let audio = AudioData::new(vec![0.0; 16_000], 16_000);
        assert!(track_pitch(&audio, 300.0, 100.0).is_err());
    }
}
