//! Core types shared by the preprocessing, engine and feature modules

/// Raw audio data representation (mono, f32 samples)
#[derive(Debug, Clone, Default)]
pub struct AudioData {
    /// Audio samples, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g., 16000)
    pub sample_rate: u32,
}

impl AudioData {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration in seconds; zero for an empty clip or an unset sample rate.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Samples widened to f64 for analysis routines.
    pub fn samples_f64(&self) -> Vec<f64> {
        self.samples.iter().map(|&s| s as f64).collect()
    }

    /// Sample index closest to `time` seconds, clamped to the clip.
    pub fn index_at(&self, time: f64) -> usize {
        let idx = (time * self.sample_rate as f64).round().max(0.0) as usize;
        idx.min(self.samples.len())
    }
}

#[cfg(test)]
mod tests {
    use super::AudioData;

    #[test]
    fn duration_from_sample_count() {
        let audio = AudioData::new(vec![0.0; 8_000], 16_000);
        assert_eq!(audio.duration_secs(), 0.5);
        assert_eq!(audio.index_at(0.25), 4_000);
        assert_eq!(audio.index_at(10.0), 8_000);
    }

    #[test]
    fn zero_rate_has_no_duration() {
        let audio = AudioData::new(vec![0.0; 10], 0);
        assert_eq!(audio.duration_secs(), 0.0);
    }
}
