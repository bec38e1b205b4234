//! Pause and speech-rate measures.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::lexical::count_syllables;
use super::stats::{mean, quantile, std_dev};
use crate::engine::{IntensityContour, IntervalKind, PitchContour, TierInterval};
use crate::transcription::AlignmentSegment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechRateConfig {
    /// Offset from the 99th intensity percentile, in dB.
    pub silence_threshold_db: f64,
    pub min_dip_db: f64,
    pub min_pause_secs: f64,
    pub min_sounding_secs: f64,
}

impl Default for SpeechRateConfig {
    fn default() -> Self {
        Self {
            silence_threshold_db: -25.0,
            min_dip_db: 2.0,
            min_pause_secs: 0.3,
            min_sounding_secs: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub pause_outlier_sigma: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pause_outlier_sigma: 3.0,
        }
    }
}

/// Gap between each word's end and the next word's start, across segment
/// boundaries.
pub fn interword_pauses(segments: &[AlignmentSegment]) -> Vec<f64> {
    let mut pauses = Vec::new();
    let mut previous_end: Option<f64> = None;
    for word in segments.iter().flat_map(|segment| &segment.words) {
        if let Some(end) = previous_end {
            pauses.push(word.start - end);
        }
        previous_end = Some(word.end);
    }
    pauses
}

/// Mean pause after dropping pauses more than `sigma` standard deviations
/// above the mean. Zero when nothing remains.
pub fn average_pause_duration(pauses: &[f64], sigma: f64) -> f64 {
    if pauses.is_empty() {
        return 0.0;
    }
    let mu = mean(pauses);
    let spread = std_dev(pauses);
    let kept: Vec<f64> = pauses
        .iter()
        .copied()
        .filter(|pause| pause - mu <= sigma * spread)
        .collect();
    if kept.len() < pauses.len() {
        debug!(dropped = pauses.len() - kept.len(), "excluded outlier pauses");
    }
    if kept.is_empty() {
        0.0
    } else {
        mean(&kept)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    Word,
    Syllable,
}

/// Words or syllables per second of aligned speaking time.
pub fn transcript_speech_rate(segments: &[AlignmentSegment], unit: RateUnit) -> f64 {
    let mut units = 0usize;
    let mut speaking_time = 0.0;
    for word in segments.iter().flat_map(|segment| &segment.words) {
        units += match unit {
            RateUnit::Word => 1,
            RateUnit::Syllable => count_syllables(&word.word),
        };
        speaking_time += word.end - word.start;
    }
    if speaking_time > 0.0 {
        units as f64 / speaking_time
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeechRate {
    pub syllables: usize,
    pub duration: f64,
    pub phonation_time: f64,
    pub speaking_rate: f64,
    pub articulation_rate: f64,
    pub average_syllable_duration: f64,
}

impl SpeechRate {
    pub fn from_counts(syllables: usize, duration: f64, phonation_time: f64) -> Self {
        let per = |denominator: f64| {
            if denominator > 0.0 {
                syllables as f64 / denominator
            } else {
                0.0
            }
        };
        Self {
            syllables,
            duration,
            phonation_time,
            speaking_rate: per(duration),
            articulation_rate: per(phonation_time),
            average_syllable_duration: if syllables > 0 {
                phonation_time / syllables as f64
            } else {
                0.0
            },
        }
    }
}

/// Absolute intensity threshold for nuclei and silences: the 99th
/// percentile plus `offset_db`, never below the quietest frame.
pub fn intensity_threshold(intensity: &IntensityContour, offset_db: f64) -> Option<f64> {
    let values = intensity.values();
    if values.is_empty() {
        return None;
    }
    let floor = values.iter().copied().fold(f64::INFINITY, f64::min);
    Some((quantile(&values, 0.99) + offset_db).max(floor))
}

/// Times of intensity peaks that clear the threshold, rise more than
/// `min_dip_db` above the preceding dip and fall on voiced frames.
pub fn syllable_nuclei(
    intensity: &IntensityContour,
    pitch: &PitchContour,
    threshold_db: f64,
    min_dip_db: f64,
) -> Vec<f64> {
    let frames = &intensity.frames;
    let peaks: Vec<usize> = (1..frames.len().saturating_sub(1))
        .filter(|&idx| {
            let db = frames[idx].db;
            db > threshold_db && db > frames[idx - 1].db && db >= frames[idx + 1].db
        })
        .collect();

    let mut nuclei = Vec::new();
    let mut dip_from = 0;
    for &peak in &peaks {
        let dip = frames[dip_from..=peak]
            .iter()
            .map(|frame| frame.db)
            .fold(f64::INFINITY, f64::min);
        dip_from = peak;
        if frames[peak].db - dip <= min_dip_db {
            continue;
        }
        if pitch.voiced_at(frames[peak].time).is_some() {
            nuclei.push(frames[peak].time);
        }
    }
    nuclei
}

pub fn phonation_time(tier: &[TierInterval]) -> f64 {
    tier.iter()
        .filter(|interval| interval.kind == IntervalKind::Sounding)
        .map(TierInterval::duration)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{IntensityFrame, PitchFrame};
    use crate::transcription::AlignedWord;
    use approx::assert_relative_eq;

    fn segment(words: &[(&str, f64, f64)]) -> AlignmentSegment {
        AlignmentSegment {
            start: words.first().map_or(0.0, |w| w.1),
            end: words.last().map_or(0.0, |w| w.2),
            text: String::new(),
            words: words
                .iter()
                .map(|&(word, start, end)| AlignedWord {
                    word: word.into(),
                    start,
                    end,
                })
                .collect(),
        }
    }

    #[test]
    fn pauses_cross_segment_boundaries() {
        let segments = [
            segment(&[("hello", 0.0, 0.4), ("there", 0.5, 0.9)]),
            segment(&[("friend", 1.2, 1.6)]),
        ];
        let pauses = interword_pauses(&segments);
        assert_eq!(pauses.len(), 2);
        assert_relative_eq!(pauses[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(pauses[1], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn outlier_pause_is_excluded() {
        let mut pauses: Vec<f64> = (0..20).map(|i| 0.2 + (i % 5) as f64 * 0.01).collect();
        let normal_mean = mean(&pauses);
        pauses.push(normal_mean * 10.0);
        assert_relative_eq!(average_pause_duration(&pauses, 3.0), normal_mean, epsilon = 1e-12);
    }

    #[test]
    fn no_pauses_average_to_zero() {
        assert_eq!(average_pause_duration(&[], 3.0), 0.0);
    }

    #[test]
    fn rates_use_speaking_time() {
        let segments = [segment(&[("hello", 0.0, 0.5), ("banana", 1.0, 1.5)])];
        assert_relative_eq!(transcript_speech_rate(&segments, RateUnit::Word), 2.0);
        assert_relative_eq!(transcript_speech_rate(&segments, RateUnit::Syllable), 5.0);
        assert_eq!(transcript_speech_rate(&[], RateUnit::Word), 0.0);
    }

    #[test]
    fn zero_syllables_guard_division() {
        let rate = SpeechRate::from_counts(0, 2.0, 1.5);
        assert_eq!(rate.average_syllable_duration, 0.0);
        assert_eq!(rate.speaking_rate, 0.0);
        let rate = SpeechRate::from_counts(6, 2.0, 1.5);
        assert_relative_eq!(rate.speaking_rate, 3.0);
        assert_relative_eq!(rate.articulation_rate, 4.0);
        assert_relative_eq!(rate.average_syllable_duration, 0.25);
    }

    #[test]
    fn nuclei_need_dip_threshold_and_voicing() {
        // three bumps; the second is too shallow, the third is unvoiced
        let levels = [
            50.0, 60.0, 70.0, 60.0, 50.0, 51.0, 50.0, 40.0, 55.0, 70.0, 55.0, 45.0,
        ];
        let intensity = IntensityContour {
            time_step: 0.1,
            frames: levels
                .iter()
                .enumerate()
                .map(|(idx, &db)| IntensityFrame {
                    time: idx as f64 * 0.1,
                    db,
                })
                .collect(),
        };
        let pitch = PitchContour {
            time_step: 0.1,
            frames: (0..12)
                .map(|idx| PitchFrame {
                    time: idx as f64 * 0.1,
                    frequency: if idx < 6 { 120.0 } else { 0.0 },
                })
                .collect(),
        };
        let nuclei = syllable_nuclei(&intensity, &pitch, 45.0, 2.0);
        assert_eq!(nuclei.len(), 1);
        assert_relative_eq!(nuclei[0], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn threshold_is_floored_at_minimum() {
        let intensity = IntensityContour {
            time_step: 0.1,
            frames: vec![
                IntensityFrame { time: 0.0, db: 60.0 },
                IntensityFrame { time: 0.1, db: 62.0 },
            ],
        };
        assert_eq!(intensity_threshold(&intensity, -25.0), Some(60.0));
    }
}
