//! Bundled pure-Rust acoustic engine.

mod formant;
mod harmonicity;
mod intensity;
mod perturbation;
mod pitch;
mod pulses;
mod silences;

use tracing::debug;

use super::{
    AcousticEngine, FormantContour, FormantSettings, HarmonicityContour, IntensityContour,
    JitterKind, PerturbationParams, PitchContour, PointProcess, ShimmerKind, TierInterval,
};
use crate::error::Result;
use crate::types::AudioData;

/// Minimum spread between the point-process pitch bounds.
const MIN_BOUND_RATIO: f64 = 1.25;

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

impl NativeEngine {
    pub fn new() -> Self {
        Self
    }
}

impl AcousticEngine for NativeEngine {
    fn formants(&self, audio: &AudioData, settings: &FormantSettings) -> Result<FormantContour> {
        let contour = formant::track_formants(audio, settings)?;
        debug!(frames = contour.frames.len(), "formant contour");
        Ok(contour)
    }

    fn pitch(&self, audio: &AudioData, floor_hz: f64, ceiling_hz: f64) -> Result<PitchContour> {
        let contour = pitch::track_pitch(audio, floor_hz, ceiling_hz)?;
        debug!(
            frames = contour.frames.len(),
            voiced = contour.voiced_frequencies().len(),
            "pitch contour"
        );
        Ok(contour)
    }

    fn intensity(&self, audio: &AudioData, min_pitch_hz: f64) -> Result<IntensityContour> {
        intensity::intensity_contour(audio, min_pitch_hz)
    }

    fn harmonicity(&self, audio: &AudioData, min_pitch_hz: f64) -> Result<HarmonicityContour> {
        harmonicity::harmonicity_contour(audio, min_pitch_hz)
    }

    fn point_process(
        &self,
        audio: &AudioData,
        floor_hz: f64,
        ceiling_hz: f64,
    ) -> Result<PointProcess> {
        // a monotone voice reports floor == ceiling; the tracker needs a range
        let (floor_hz, ceiling_hz) = if ceiling_hz < floor_hz * MIN_BOUND_RATIO {
            let centre = (floor_hz * ceiling_hz).sqrt();
            (centre / MIN_BOUND_RATIO, centre * MIN_BOUND_RATIO)
        } else {
            (floor_hz, ceiling_hz)
        };
        let contour = pitch::track_pitch(audio, floor_hz, ceiling_hz)?;
        let points = pulses::pulses_from_pitch(audio, &contour, floor_hz, ceiling_hz);
        debug!(pulses = points.times.len(), floor_hz, ceiling_hz, "point process");
        Ok(points)
    }

    fn jitter(
        &self,
        points: &PointProcess,
        kind: JitterKind,
        params: &PerturbationParams,
    ) -> Result<f64> {
        perturbation::jitter(points, kind, params)
    }

    fn shimmer(
        &self,
        audio: &AudioData,
        points: &PointProcess,
        kind: ShimmerKind,
        params: &PerturbationParams,
    ) -> Result<f64> {
        perturbation::shimmer(audio, points, kind, params)
    }

    fn silences(
        &self,
        intensity: &IntensityContour,
        threshold_db: f64,
        min_pause: f64,
        min_sounding: f64,
    ) -> Result<Vec<TierInterval>> {
        silences::segment(intensity, threshold_db, min_pause, min_sounding)
    }
}
