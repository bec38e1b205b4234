use crate::engine::{PitchContour, PointProcess};
use crate::types::AudioData;

const SEARCH_LOW: f64 = 0.8;
const SEARCH_HIGH: f64 = 1.2;

/// Places one pulse per glottal cycle inside every voiced stretch of the
/// pitch contour, snapping each pulse to the waveform maximum near the
/// expected period.
pub(super) fn pulses_from_pitch(
    audio: &AudioData,
    pitch: &PitchContour,
    floor_hz: f64,
    ceiling_hz: f64,
) -> PointProcess {
    let sr = audio.sample_rate as f64;
    let mut times = Vec::new();
    if sr <= 0.0 || audio.samples.is_empty() {
        return PointProcess { times };
    }
    let half_step = pitch.time_step / 2.0;

    for (run_start, run_end) in voiced_runs(pitch) {
        let region_start = (pitch.frames[run_start].time - half_step).max(0.0);
        let region_end = (pitch.frames[run_end].time + half_step).min(audio.duration_secs());
        let first_period = period_for(pitch.frames[run_start].frequency, floor_hz, ceiling_hz);

        let Some(mut pulse) = peak_index(
            audio,
            audio.index_at(region_start),
            audio.index_at(region_start + first_period),
        ) else {
            continue;
        };
        times.push(pulse as f64 / sr);

        loop {
            let now = pulse as f64 / sr;
            let frequency = pitch
                .voiced_at(now)
                .unwrap_or(pitch.frames[run_end].frequency);
            let period = period_for(frequency, floor_hz, ceiling_hz);
            let window_end = now + SEARCH_HIGH * period;
            if window_end > region_end {
                break;
            }
            let Some(next) = peak_index(
                audio,
                audio.index_at(now + SEARCH_LOW * period),
                audio.index_at(window_end),
            ) else {
                break;
            };
            if next <= pulse {
                break;
            }
            pulse = next;
            times.push(pulse as f64 / sr);
        }
    }

    PointProcess { times }
}

fn voiced_runs(pitch: &PitchContour) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    for (idx, frame) in pitch.frames.iter().enumerate() {
        match (frame.frequency > 0.0, start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                runs.push((s, idx - 1));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, pitch.frames.len() - 1));
    }
    runs
}

fn period_for(frequency: f64, floor_hz: f64, ceiling_hz: f64) -> f64 {
    1.0 / frequency.clamp(floor_hz, ceiling_hz)
}

fn peak_index(audio: &AudioData, start: usize, end: usize) -> Option<usize> {
    let end = end.min(audio.samples.len());
    if start >= end {
        return None;
    }
    audio.samples[start..end]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(offset, _)| start + offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PitchFrame;

    #[test]
    fn steady_tone_yields_one_pulse_per_cycle() {
        let sr = 16_000u32;
        let f0 = 100.0;
        let samples: Vec<f32> = (0..sr / 2)
            .map(|i| (2.0 * std::f32::consts::PI * f0 as f32 * i as f32 / sr as f32).sin())
            .collect();
        let audio = AudioData::new(samples, sr);
        let pitch = PitchContour {
            time_step: 0.01,
            frames: (0..50)
                .map(|i| PitchFrame {
                    time: 0.005 + i as f64 * 0.01,
                    frequency: f0,
                })
                .collect(),
        };
        let points = pulses_from_pitch(&audio, &pitch, 75.0, 600.0);
        assert!(points.times.len() >= 45 && points.times.len() <= 50);
        for pair in points.times.windows(2) {
            assert!((pair[1] - pair[0] - 0.01).abs() < 2.0e-4);
        }
    }

    #[test]
    fn unvoiced_contour_has_no_pulses() {
        let audio = AudioData::new(vec![0.1; 1_600], 16_000);
        let pitch = PitchContour {
            time_step: 0.01,
            frames: vec![
                PitchFrame {
                    time: 0.005,
                    frequency: 0.0
                };
                10
            ],
        };
        assert!(pulses_from_pitch(&audio, &pitch, 75.0, 600.0).times.is_empty());
    }
}
