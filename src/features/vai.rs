//! Vowel Articulation Index from the four corner vowels.

use tracing::debug;

use crate::engine::FormantContour;
use crate::error::{AnalysisError, Result};
use crate::transcription::PhoneInterval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CornerVowel {
    /// /i/ as in "beet"
    I,
    /// /u/ as in "boot"
    U,
    /// /æ/ as in "bat"
    Ae,
    /// /ɑ/ as in "father"
    A,
}

impl CornerVowel {
    pub const ALL: [CornerVowel; 4] = [CornerVowel::I, CornerVowel::U, CornerVowel::Ae, CornerVowel::A];

    /// Matches IPA or ARPAbet labels, ignoring case and stress digits.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .filter(|c| !c.is_ascii_digit())
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "i" | "iy" => Some(CornerVowel::I),
            "u" | "uw" => Some(CornerVowel::U),
            "æ" | "ae" => Some(CornerVowel::Ae),
            "ɑ" | "aa" => Some(CornerVowel::A),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            CornerVowel::I => 0,
            CornerVowel::U => 1,
            CornerVowel::Ae => 2,
            CornerVowel::A => 3,
        }
    }
}

/// Mean (F1, F2) in Hz of one vowel category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VowelFormants {
    pub f1: f64,
    pub f2: f64,
}

/// `(F2_i − F1_ɑ) / (F2_u + F2_ɑ + F1_u + F1_i)`
pub fn vai_from_means(i: VowelFormants, u: VowelFormants, a: VowelFormants) -> f64 {
    (i.f2 - a.f1) / (u.f2 + a.f2 + u.f1 + i.f1)
}

/// Averages F1/F2 over `sample_points` evenly spaced interior instants of
/// each interval, skipping undefined samples.
fn occurrence_formants(
    contour: &FormantContour,
    interval: &PhoneInterval,
    sample_points: usize,
) -> Option<VowelFormants> {
    let points = sample_points.max(1);
    let span = interval.end - interval.start;
    if span <= 0.0 {
        return None;
    }
    let mean_of = |number: usize| -> Option<f64> {
        let values: Vec<f64> = (0..points)
            .map(|j| interval.start + span * (j + 1) as f64 / (points + 1) as f64)
            .filter_map(|time| contour.value_at(number, time))
            .filter(|value| value.is_finite() && *value > 0.0)
            .collect();
        (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
    };
    Some(VowelFormants {
        f1: mean_of(1)?,
        f2: mean_of(2)?,
    })
}

/// Vowel means per corner vowel, `None` where no occurrence had usable formants.
pub fn corner_vowel_means(
    contour: &FormantContour,
    phones: &[PhoneInterval],
    sample_points: usize,
) -> [Option<VowelFormants>; 4] {
    let mut sums = [(0.0, 0.0, 0usize); 4];
    for interval in phones {
        let Some(vowel) = CornerVowel::from_label(&interval.label) else {
            continue;
        };
        if let Some(formants) = occurrence_formants(contour, interval, sample_points) {
            let slot = &mut sums[vowel.index()];
            slot.0 += formants.f1;
            slot.1 += formants.f2;
            slot.2 += 1;
        }
    }
    sums.map(|(f1, f2, count)| {
        (count > 0).then(|| VowelFormants {
            f1: f1 / count as f64,
            f2: f2 / count as f64,
        })
    })
}

/// Undefined when any corner vowel is missing from the phone tier.
pub fn vowel_articulation_index(
    contour: &FormantContour,
    phones: &[PhoneInterval],
    sample_points: usize,
) -> Result<f64> {
    let means = corner_vowel_means(contour, phones, sample_points);
    let present = means.iter().filter(|m| m.is_some()).count();
    debug!(corner_vowels = present, "vowel articulation index");
    match means {
        [Some(i), Some(u), Some(_ae), Some(a)] => Ok(vai_from_means(i, u, a)),
        _ => Err(AnalysisError::Undefined("vai")),
    }
}
