//! Statically shaped per-file metric record.
//!
//! Every metric is a field, so a record can neither gain nor lose a name;
//! finalising a failed file is just leaving fields at `None`.

use crate::features::cepstral::{CoefficientSummary, MFCC_COUNT};

const MFCC_STATS: [&str; 4] = ["mean", "std", "min", "max"];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MfccSummary {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl MfccSummary {
    fn values(&self) -> [Option<f64>; 4] {
        [self.mean, self.std, self.min, self.max]
    }

    fn slot_mut(&mut self, stat: &str) -> Option<&mut Option<f64>> {
        match stat {
            "mean" => Some(&mut self.mean),
            "std" => Some(&mut self.std),
            "min" => Some(&mut self.min),
            "max" => Some(&mut self.max),
            _ => None,
        }
    }
}

impl From<CoefficientSummary> for MfccSummary {
    fn from(summary: CoefficientSummary) -> Self {
        Self {
            mean: Some(summary.mean),
            std: Some(summary.std),
            min: Some(summary.min),
            max: Some(summary.max),
        }
    }
}

macro_rules! metric_record {
    ($($field:ident),* $(,)?) => {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct MetricRecord {
            $(pub $field: Option<f64>,)*
            pub mfcc: [MfccSummary; MFCC_COUNT],
        }

        impl MetricRecord {
            /// Scalar metric names in canonical order.
            pub const SCALAR_NAMES: &'static [&'static str] = &[$(stringify!($field)),*];

            fn scalar_values(&self) -> Vec<Option<f64>> {
                vec![$(self.$field),*]
            }

            fn scalar_slot_mut(&mut self, name: &str) -> Option<&mut Option<f64>> {
                match name {
                    $(stringify!($field) => Some(&mut self.$field),)*
                    _ => None,
                }
            }
        }
    };
}

metric_record!(
    average_pause_duration,
    speech_rate,
    articulation_rate,
    average_syllable_duration,
    speech_rate_word,
    speech_rate_syllable,
    aavs,
    hull_area,
    ff_mean,
    ff_median,
    ff_std,
    ff_min,
    ff_max,
    inten_mean,
    inten_median,
    inten_std,
    inten_min,
    inten_max,
    harm_mean,
    harm_std,
    harm_min,
    harm_max,
    shimmer_local,
    shimmer_local_db,
    shimmer_apq3,
    shimmer_apq5,
    jitter_local,
    jitter_local_absolute,
    jitter_rap,
    jitter_ppq5,
    ppe,
    vai,
    avg_word_length,
    avg_syllables_per_word,
    content_richness,
    mattr,
    phrase_patterns,
    sentence_length,
);

impl MetricRecord {
    /// Every metric name: scalars, then `mfcc_{i}_{stat}`.
    pub fn names() -> Vec<String> {
        let mut names: Vec<String> = Self::SCALAR_NAMES.iter().map(|name| name.to_string()).collect();
        for coefficient in 0..MFCC_COUNT {
            for stat in MFCC_STATS {
                names.push(format!("mfcc_{coefficient}_{stat}"));
            }
        }
        names
    }

    /// Values aligned with [`MetricRecord::names`].
    pub fn values(&self) -> Vec<Option<f64>> {
        let mut values = self.scalar_values();
        for summary in &self.mfcc {
            values.extend(summary.values());
        }
        values
    }

    pub fn get(&self, name: &str) -> Option<Option<f64>> {
        let idx = Self::names().iter().position(|candidate| candidate == name)?;
        Some(self.values()[idx])
    }

    /// Mutable access by canonical name; `None` for unknown names.
    pub fn slot_mut(&mut self, name: &str) -> Option<&mut Option<f64>> {
        if let Some(rest) = name.strip_prefix("mfcc_") {
            let (coefficient, stat) = rest.split_once('_')?;
            let coefficient: usize = coefficient.parse().ok()?;
            return self.mfcc.get_mut(coefficient)?.slot_mut(stat);
        }
        self.scalar_slot_mut(name)
    }

    pub fn defined_count(&self) -> usize {
        self.values().iter().filter(|value| value.is_some()).count()
    }

    /// Replaces non-finite values with `None`.
    pub fn sanitize(&mut self) {
        for name in Self::names() {
            if let Some(slot) = self.slot_mut(&name) {
                if slot.is_some_and(|value| !value.is_finite()) {
                    *slot = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_values_line_up() {
        let mut record = MetricRecord::default();
        record.vai = Some(0.7);
        record.mfcc[12].max = Some(4.0);
        let names = MetricRecord::names();
        let values = record.values();
        assert_eq!(names.len(), MetricRecord::SCALAR_NAMES.len() + 4 * MFCC_COUNT);
        assert_eq!(names.len(), values.len());
        assert_eq!(record.get("vai"), Some(Some(0.7)));
        assert_eq!(record.get("mfcc_12_max"), Some(Some(4.0)));
        assert_eq!(names.last().map(String::as_str), Some("mfcc_12_max"));
        assert_eq!(record.get("unknown"), None);
    }

    #[test]
    fn slots_resolve_by_name() {
        let mut record = MetricRecord::default();
        *record.slot_mut("jitter_rap").unwrap() = Some(0.01);
        *record.slot_mut("mfcc_3_std").unwrap() = Some(2.0);
        assert_eq!(record.jitter_rap, Some(0.01));
        assert_eq!(record.mfcc[3].std, Some(2.0));
        assert!(record.slot_mut("mfcc_13_std").is_none());
        assert!(record.slot_mut("mfcc_x").is_none());
        assert_eq!(record.defined_count(), 2);
    }

    #[test]
    fn sanitize_drops_non_finite() {
        let mut record = MetricRecord::default();
        record.ppe = Some(f64::NAN);
        record.aavs = Some(1.0);
        record.sanitize();
        assert_eq!(record.ppe, None);
        assert_eq!(record.aavs, Some(1.0));
    }
}
