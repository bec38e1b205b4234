//! Formant trajectories sampled from an engine contour.

use clap::ValueEnum;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::bark::bark_transform;
use crate::engine::{FormantContour, FormantSettings};

/// Coordinate space used for the dispersion metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DispersionSpace {
    #[default]
    Bark,
    Hz,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormantConfig {
    pub time_step: f64,
    pub max_formants: usize,
    pub max_formant_hz: f64,
    pub window_length: f64,
    pub dispersion_space: DispersionSpace,
    pub vowel_sample_points: usize,
}

impl Default for FormantConfig {
    fn default() -> Self {
        let engine = FormantSettings::default();
        Self {
            time_step: engine.time_step,
            max_formants: engine.max_formants,
            max_formant_hz: engine.max_formant_hz,
            window_length: engine.window_length,
            dispersion_space: DispersionSpace::Bark,
            vowel_sample_points: 5,
        }
    }
}

impl FormantConfig {
    pub fn engine_settings(&self) -> FormantSettings {
        FormantSettings {
            time_step: self.time_step,
            max_formants: self.max_formants,
            max_formant_hz: self.max_formant_hz,
            window_length: self.window_length,
        }
    }
}

/// F1/F2 at one instant. Depending on the trajectory view the values are
/// in Hz or in Bark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormantSample {
    pub time: f64,
    pub f1: f64,
    pub f2: f64,
}

/// Hz samples and their Bark counterparts, index-aligned so that
/// `hz[i].time == bark[i].time`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormantTrajectory {
    hz: Vec<FormantSample>,
    bark: Vec<FormantSample>,
}

impl FormantTrajectory {
    /// Samples F1 and F2 every `time_step` seconds from the contour start,
    /// keeping only instants where both formants are positive.
    pub fn from_contour(contour: &FormantContour, time_step: f64) -> Self {
        let mut trajectory = Self::default();
        if time_step <= 0.0 || contour.end_time <= contour.start_time {
            return trajectory;
        }
        let count = ((contour.end_time - contour.start_time) / time_step).ceil() as usize;
        for idx in 0..count {
            let time = contour.start_time + idx as f64 * time_step;
            let (Some(f1), Some(f2)) = (contour.value_at(1, time), contour.value_at(2, time)) else {
                continue;
            };
            if f1 > 0.0 && f2 > 0.0 {
                trajectory.push(FormantSample { time, f1, f2 });
            }
        }
        trajectory
    }

    pub fn from_hz(samples: impl IntoIterator<Item = FormantSample>) -> Self {
        let mut trajectory = Self::default();
        for sample in samples {
            if sample.f1 > 0.0 && sample.f2 > 0.0 {
                trajectory.push(sample);
            }
        }
        trajectory
    }

    fn push(&mut self, sample: FormantSample) {
        self.bark.push(FormantSample {
            time: sample.time,
            f1: bark_transform(sample.f1),
            f2: bark_transform(sample.f2),
        });
        self.hz.push(sample);
    }

    pub fn hz(&self) -> &[FormantSample] {
        &self.hz
    }

    pub fn bark(&self) -> &[FormantSample] {
        &self.bark
    }

    pub fn len(&self) -> usize {
        self.hz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hz.is_empty()
    }

    /// Keeps the samples whose mask entry is true, in both views.
    pub fn retain_mask(&self, keep: &[bool]) -> Self {
        let pick = |samples: &[FormantSample]| -> Vec<FormantSample> {
            samples
                .iter()
                .zip(keep)
                .filter(|(_, keep)| **keep)
                .map(|(sample, _)| *sample)
                .collect()
        };
        Self {
            hz: pick(&self.hz),
            bark: pick(&self.bark),
        }
    }

    /// `n × 2` matrix of (F1, F2) in the requested space.
    pub fn cloud(&self, space: DispersionSpace) -> Array2<f64> {
        let samples = match space {
            DispersionSpace::Bark => &self.bark,
            DispersionSpace::Hz => &self.hz,
        };
        let mut cloud = Array2::zeros((samples.len(), 2));
        for (idx, sample) in samples.iter().enumerate() {
            cloud[[idx, 0]] = sample.f1;
            cloud[[idx, 1]] = sample.f2;
        }
        cloud
    }
}
