//! MFCC summaries from a mel spectrogram.

use aus::analysis;
use aus::analysis::mel::MelFilterbank;
use aus::spectrum;
use aus::WindowType;

use super::stats::{mean, std_dev};
use crate::audio::resample;
use crate::error::{AnalysisError, Result};
use crate::types::AudioData;

pub const MFCC_COUNT: usize = 13;
const TARGET_SAMPLE_RATE: u32 = 16_000;
const WINDOW_MS: usize = 25;
const HOP_MS: usize = 10;
const MEL_BANDS: usize = 80;
const MIN_FREQ: f64 = 20.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoefficientSummary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Per-frame MFCCs, `frames × MFCC_COUNT`.
pub fn mfcc_frames(audio: &AudioData) -> Result<Vec<Vec<f64>>> {
    let samples = if audio.sample_rate == TARGET_SAMPLE_RATE {
        audio.samples.clone()
    } else {
        resample::linear_resample(&audio.samples, audio.sample_rate, TARGET_SAMPLE_RATE)?
    };
    let fft_size = (TARGET_SAMPLE_RATE as usize * WINDOW_MS) / 1000;
    let hop_size = (TARGET_SAMPLE_RATE as usize * HOP_MS) / 1000;
    if samples.len() < fft_size {
        return Err(AnalysisError::InsufficientData {
            required: fft_size,
            actual: samples.len(),
        });
    }
    let signal: Vec<f64> = samples.iter().map(|&s| s as f64).collect();

    let stft = spectrum::rstft(&signal, fft_size, hop_size, WindowType::Hanning);
    let (magnitude, _) = spectrum::complex_to_polar_rstft(&stft);
    let power = analysis::make_power_spectrogram(&magnitude);

    let freqs = spectrum::rfftfreq(fft_size, TARGET_SAMPLE_RATE);
    let filterbank = MelFilterbank::new(
        MIN_FREQ,
        TARGET_SAMPLE_RATE as f64 / 2.0,
        MEL_BANDS,
        &freqs,
        true,
    );
    let mel = analysis::mel::make_mel_spectrogram(&power, &filterbank);
    Ok(analysis::mel::mfcc_spectrogram(&mel, MFCC_COUNT, None))
}

/// Mean, population std, min and max of each coefficient over frames,
/// ignoring non-finite values.
pub fn summarize(frames: &[Vec<f64>]) -> Result<[CoefficientSummary; MFCC_COUNT]> {
    let mut summaries = [CoefficientSummary::default(); MFCC_COUNT];
    for (coefficient, summary) in summaries.iter_mut().enumerate() {
        let values: Vec<f64> = frames
            .iter()
            .filter_map(|frame| frame.get(coefficient).copied())
            .filter(|value| value.is_finite())
            .collect();
        if values.is_empty() {
            return Err(AnalysisError::Undefined("mfcc"));
        }
        *summary = CoefficientSummary {
            mean: mean(&values),
            std: std_dev(&values),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        };
    }
    Ok(summaries)
}

pub fn mfcc_summary(audio: &AudioData) -> Result<[CoefficientSummary; MFCC_COUNT]> {
    summarize(&mfcc_frames(audio)?)
}
