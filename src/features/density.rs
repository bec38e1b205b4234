use tracing::debug;

use super::formants::FormantTrajectory;
use super::stats::quantile;
use crate::cluster::{ClusterSettings, GaussianMixture};
use crate::error::Result;

const IQR_FACTOR: f64 = 1.5;

/// Drops formant samples that sit in low-density regions of the Bark cloud.
#[derive(Debug, Clone, Default)]
pub struct DensityFilter {
    settings: ClusterSettings,
}

impl DensityFilter {
    pub fn new(settings: ClusterSettings) -> Self {
        Self { settings }
    }

    /// Fits a mixture to the Bark (F1, F2) cloud and keeps samples whose
    /// log-likelihood is strictly above `Q1 - 1.5·IQR`. Both views of the
    /// result keep the surviving timestamps only.
    pub fn filter(&self, trajectory: &FormantTrajectory) -> Result<FormantTrajectory> {
        let cloud = trajectory.cloud(super::formants::DispersionSpace::Bark);
        let mixture = GaussianMixture::fit(cloud.view(), &self.settings)?;
        let scores = mixture.score_samples(cloud.view());
        let keep = inlier_mask(&scores);
        let filtered = trajectory.retain_mask(&keep);
        debug!(
            before = trajectory.len(),
            after = filtered.len(),
            "density filter"
        );
        Ok(filtered)
    }
}

/// Tukey lower fence on log-likelihoods.
pub fn inlier_mask(log_likelihoods: &[f64]) -> Vec<bool> {
    if log_likelihoods.is_empty() {
        return Vec::new();
    }
    let q1 = quantile(log_likelihoods, 0.25);
    let q3 = quantile(log_likelihoods, 0.75);
    let threshold = q1 - IQR_FACTOR * (q3 - q1);
    log_likelihoods.iter().map(|&ll| ll > threshold).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::formants::FormantSample;

    #[test]
    fn fence_drops_only_the_low_tail() {
        let mut scores = vec![-2.0, -2.1, -1.9, -2.05, -1.95, -2.0, -2.02, -1.98];
        scores.push(-40.0);
        let mask = inlier_mask(&scores);
        assert_eq!(mask.iter().filter(|keep| !**keep).count(), 1);
        assert!(!mask[8]);
    }

    #[test]
    fn filtered_trajectory_is_a_subset() {
        let mut samples = Vec::new();
        let mut time = 0.0;
        for (f1, f2) in [(300.0, 2300.0), (700.0, 1200.0), (500.0, 1500.0)] {
            for i in 0..12 {
                let jitter = (i % 4) as f64 * 10.0 - 15.0;
                let spread = (i / 4) as f64 * 12.0 - 12.0;
                samples.push(FormantSample {
                    time,
                    f1: f1 + jitter,
                    f2: f2 + spread,
                });
                time += 0.01;
            }
        }
        samples.push(FormantSample { time, f1: 1500.0, f2: 600.0 });
        let trajectory = FormantTrajectory::from_hz(samples);
        let filter = DensityFilter::new(ClusterSettings {
            cluster_count: 1,
            ..ClusterSettings::default()
        });
        let filtered = filter.filter(&trajectory).unwrap();

        assert_eq!(filtered.len(), trajectory.len() - 1);
        let original_times: Vec<f64> = trajectory.hz().iter().map(|s| s.time).collect();
        for (hz, bark) in filtered.hz().iter().zip(filtered.bark()) {
            assert!(original_times.contains(&hz.time));
            assert_eq!(hz.time, bark.time);
        }
        assert!(filtered.hz().iter().all(|s| s.f1 != 1500.0));
    }

    #[test]
    fn too_few_samples_is_recoverable() {
        let trajectory = FormantTrajectory::from_hz([FormantSample {
            time: 0.0,
            f1: 500.0,
            f2: 1500.0,
        }]);
        assert!(DensityFilter::default().filter(&trajectory).is_err());
    }
}
