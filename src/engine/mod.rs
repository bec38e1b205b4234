//! Acoustic Analysis Engine interface.
//!
//! The feature calculators only aggregate what an engine measures; they
//! never look inside how a contour or a perturbation value was produced.
//! The engine is handed to the pipeline as an explicit shared handle so
//! tests can substitute a scripted implementation.

pub mod native;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::AudioData;

/// Parameters for formant tracking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormantSettings {
    pub time_step: f64,
    pub max_formants: usize,
    pub max_formant_hz: f64,
    pub window_length: f64,
}

impl Default for FormantSettings {
    fn default() -> Self {
        Self {
            time_step: 0.01,
            max_formants: 5,
            max_formant_hz: 5500.0,
            window_length: 0.025,
        }
    }
}

/// Boundary parameters shared by every jitter and shimmer variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerturbationParams {
    pub period_floor: f64,
    pub period_ceiling: f64,
    pub max_period_factor: f64,
    pub max_amplitude_factor: f64,
}

impl Default for PerturbationParams {
    fn default() -> Self {
        Self {
            period_floor: 0.0001,
            period_ceiling: 0.02,
            max_period_factor: 1.3,
            max_amplitude_factor: 1.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterKind {
    Local,
    LocalAbsolute,
    Rap,
    Ppq5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShimmerKind {
    Local,
    LocalDb,
    Apq3,
    Apq5,
}

/// One analysis frame of a formant track. Missing formants are absent from
/// `frequencies`, which is sorted ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct FormantFrame {
    pub time: f64,
    pub frequencies: Vec<f64>,
}

/// Time-stepped formant estimates with equally spaced frames.
#[derive(Debug, Clone, PartialEq)]
pub struct FormantContour {
    pub start_time: f64,
    pub end_time: f64,
    pub time_step: f64,
    pub frames: Vec<FormantFrame>,
}

impl FormantContour {
    /// Formant `number` (1 = F1) at `time`, linearly interpolated between the
    /// neighbouring frames. Returns `None` outside the analysed range or
    /// where a neighbouring frame lacks the formant.
    pub fn value_at(&self, number: usize, time: f64) -> Option<f64> {
        let first = self.frames.first()?;
        if number == 0 || self.time_step <= 0.0 {
            return None;
        }
        let last_index = self.frames.len() - 1;
        let position = (time - first.time) / self.time_step;
        if position < -0.5 || position > last_index as f64 + 0.5 {
            return None;
        }
        let formant = |idx: usize| self.frames[idx].frequencies.get(number - 1).copied();
        if position <= 0.0 {
            return formant(0);
        }
        if position >= last_index as f64 {
            return formant(last_index);
        }
        let lower = position.floor() as usize;
        let upper = (lower + 1).min(last_index);
        let weight = position - lower as f64;
        let (a, b) = (formant(lower)?, formant(upper)?);
        Some(a + (b - a) * weight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchFrame {
    pub time: f64,
    /// Zero marks an unvoiced frame.
    pub frequency: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PitchContour {
    pub time_step: f64,
    pub frames: Vec<PitchFrame>,
}

impl PitchContour {
    pub fn voiced_frequencies(&self) -> Vec<f64> {
        self.frames
            .iter()
            .filter(|frame| frame.frequency > 0.0)
            .map(|frame| frame.frequency)
            .collect()
    }

    /// Pitch of the frame nearest to `time`, `None` when that frame is unvoiced.
    pub fn voiced_at(&self, time: f64) -> Option<f64> {
        let first = self.frames.first()?;
        if self.time_step <= 0.0 {
            return None;
        }
        let position = ((time - first.time) / self.time_step).round();
        if position < 0.0 || position as usize >= self.frames.len() {
            return None;
        }
        let frequency = self.frames[position as usize].frequency;
        (frequency > 0.0).then_some(frequency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityFrame {
    pub time: f64,
    pub db: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntensityContour {
    pub time_step: f64,
    pub frames: Vec<IntensityFrame>,
}

impl IntensityContour {
    pub fn values(&self) -> Vec<f64> {
        self.frames.iter().map(|frame| frame.db).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicityFrame {
    pub time: f64,
    /// Harmonics-to-noise ratio in dB; `None` for silent or aperiodic frames.
    pub hnr: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicityContour {
    pub time_step: f64,
    pub frames: Vec<HarmonicityFrame>,
}

/// Glottal pulse instants in seconds, ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointProcess {
    pub times: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    Silent,
    Sounding,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierInterval {
    pub start: f64,
    pub end: f64,
    pub kind: IntervalKind,
}

impl TierInterval {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Black-box acoustic measurements consumed by the feature calculators.
pub trait AcousticEngine: Send + Sync {
    fn formants(&self, audio: &AudioData, settings: &FormantSettings) -> Result<FormantContour>;

    fn pitch(&self, audio: &AudioData, floor_hz: f64, ceiling_hz: f64) -> Result<PitchContour>;

    fn intensity(&self, audio: &AudioData, min_pitch_hz: f64) -> Result<IntensityContour>;

    fn harmonicity(&self, audio: &AudioData, min_pitch_hz: f64) -> Result<HarmonicityContour>;

    fn point_process(
        &self,
        audio: &AudioData,
        floor_hz: f64,
        ceiling_hz: f64,
    ) -> Result<PointProcess>;

    fn jitter(
        &self,
        points: &PointProcess,
        kind: JitterKind,
        params: &PerturbationParams,
    ) -> Result<f64>;

    fn shimmer(
        &self,
        audio: &AudioData,
        points: &PointProcess,
        kind: ShimmerKind,
        params: &PerturbationParams,
    ) -> Result<f64>;

    /// Splits a recording into silent and sounding intervals using an
    /// absolute intensity threshold.
    fn silences(
        &self,
        intensity: &IntensityContour,
        threshold_db: f64,
        min_pause: f64,
        min_sounding: f64,
    ) -> Result<Vec<TierInterval>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contour() -> FormantContour {
        FormantContour {
            start_time: 0.0,
            end_time: 0.04,
            time_step: 0.01,
            frames: vec![
                FormantFrame {
                    time: 0.005,
                    frequencies: vec![500.0, 1500.0],
                },
                FormantFrame {
                    time: 0.015,
                    frequencies: vec![700.0, 1700.0],
                },
                FormantFrame {
                    time: 0.025,
                    frequencies: vec![600.0],
                },
            ],
        }
    }

    #[test]
    fn interpolates_between_frames() {
        let contour = contour();
        let f1 = contour.value_at(1, 0.010).unwrap();
        assert!((f1 - 600.0).abs() < 1e-9);
        let f2 = contour.value_at(2, 0.0125).unwrap();
        assert!((f2 - 1650.0).abs() < 1e-9);
    }

    #[test]
    fn missing_formant_or_out_of_range_is_none() {
        let contour = contour();
        assert!(contour.value_at(2, 0.020).is_none());
        assert!(contour.value_at(1, 0.5).is_none());
        assert_eq!(contour.value_at(1, 0.001), Some(500.0));
        assert!(contour.value_at(0, 0.01).is_none());
    }

    #[test]
    fn pitch_lookup_respects_voicing() {
        let pitch = PitchContour {
            time_step: 0.01,
            frames: vec![
                PitchFrame {
                    time: 0.0,
                    frequency: 0.0,
                },
                PitchFrame {
                    time: 0.01,
                    frequency: 120.0,
                },
            ],
        };
        assert_eq!(pitch.voiced_at(0.011), Some(120.0));
        assert_eq!(pitch.voiced_at(0.001), None);
        assert_eq!(pitch.voiced_frequencies(), vec![120.0]);
    }
}
