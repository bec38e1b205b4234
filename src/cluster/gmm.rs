//! Full-covariance Gaussian mixture for 2-D clouds, fitted with EM from a
//! k-means start.

use std::f64::consts::PI;

use ndarray::ArrayView2;
use tracing::{debug, warn};

use super::{row, ClusterSettings, KMeans};
use crate::error::{AnalysisError, Result};

const REG_COVAR: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Component {
    weight: f64,
    mean: [f64; 2],
    covariance: [[f64; 2]; 2],
}

impl Component {
    fn log_density(&self, point: [f64; 2]) -> f64 {
        let [[a, b], [_, d]] = self.covariance;
        let det = a * d - b * b;
        let dx = point[0] - self.mean[0];
        let dy = point[1] - self.mean[1];
        // inverse of a symmetric 2×2 is [[d, -b], [-b, a]] / det
        let mahalanobis = (d * dx * dx - 2.0 * b * dx * dy + a * dy * dy) / det;
        -0.5 * (2.0 * (2.0 * PI).ln() + det.ln() + mahalanobis)
    }
}

#[derive(Debug, Clone)]
pub struct GaussianMixture {
    components: Vec<Component>,
    pub converged: bool,
    pub iterations: usize,
}

impl GaussianMixture {
    pub fn fit(points: ArrayView2<f64>, settings: &ClusterSettings) -> Result<Self> {
        let k = settings.cluster_count;
        let n = points.nrows();
        if k == 0 || n < k {
            return Err(AnalysisError::InsufficientData {
                required: k.max(1),
                actual: n,
            });
        }

        let start = KMeans::fit(points, k, settings)?;
        let mut responsibilities = vec![vec![0.0; k]; n];
        for (idx, &label) in start.labels.iter().enumerate() {
            responsibilities[idx][label] = 1.0;
        }
        let mut components = maximize(&points, &responsibilities)?;

        let mut lower_bound = f64::NEG_INFINITY;
        let mut converged = false;
        let mut iterations = 0;
        while iterations < settings.max_iterations {
            iterations += 1;
            let bound = expect(&points, &components, &mut responsibilities);
            components = maximize(&points, &responsibilities)?;
            if (bound - lower_bound).abs() < settings.tolerance {
                converged = true;
                break;
            }
            lower_bound = bound;
        }
        if converged {
            debug!(k, iterations, lower_bound, "mixture converged");
        } else {
            warn!(k, iterations, "mixture did not converge");
        }

        Ok(Self {
            components,
            converged,
            iterations,
        })
    }

    /// Per-sample log-likelihood under the fitted mixture.
    pub fn score_samples(&self, points: ArrayView2<f64>) -> Vec<f64> {
        (0..points.nrows())
            .map(|idx| {
                let point = row(&points, idx);
                let terms: Vec<f64> = self
                    .components
                    .iter()
                    .map(|c| c.weight.ln() + c.log_density(point))
                    .collect();
                log_sum_exp(&terms)
            })
            .collect()
    }

    pub fn means(&self) -> Vec<[f64; 2]> {
        self.components.iter().map(|c| c.mean).collect()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.weight).collect()
    }
}

/// E-step: refreshes responsibilities, returns the mean log-likelihood.
fn expect(points: &ArrayView2<f64>, components: &[Component], responsibilities: &mut [Vec<f64>]) -> f64 {
    let mut total = 0.0;
    for (idx, resp) in responsibilities.iter_mut().enumerate() {
        let point = row(points, idx);
        for (slot, component) in resp.iter_mut().zip(components) {
            *slot = component.weight.ln() + component.log_density(point);
        }
        let norm = log_sum_exp(resp);
        for slot in resp.iter_mut() {
            *slot = (*slot - norm).exp();
        }
        total += norm;
    }
    total / responsibilities.len() as f64
}

/// M-step: weights, means and regularised covariances from responsibilities.
fn maximize(points: &ArrayView2<f64>, responsibilities: &[Vec<f64>]) -> Result<Vec<Component>> {
    let n = points.nrows();
    let k = responsibilities.first().map_or(0, Vec::len);
    (0..k)
        .map(|c| {
            let mass = responsibilities.iter().map(|r| r[c]).sum::<f64>() + 10.0 * f64::EPSILON;
            let mut mean = [0.0; 2];
            for (idx, resp) in responsibilities.iter().enumerate() {
                let [x, y] = row(points, idx);
                mean[0] += resp[c] * x;
                mean[1] += resp[c] * y;
            }
            mean = [mean[0] / mass, mean[1] / mass];

            let mut covariance = [[0.0; 2]; 2];
            for (idx, resp) in responsibilities.iter().enumerate() {
                let [x, y] = row(points, idx);
                let (dx, dy) = (x - mean[0], y - mean[1]);
                covariance[0][0] += resp[c] * dx * dx;
                covariance[0][1] += resp[c] * dx * dy;
                covariance[1][1] += resp[c] * dy * dy;
            }
            covariance[0][0] = covariance[0][0] / mass + REG_COVAR;
            covariance[1][1] = covariance[1][1] / mass + REG_COVAR;
            covariance[0][1] /= mass;
            covariance[1][0] = covariance[0][1];

            let det = covariance[0][0] * covariance[1][1] - covariance[0][1].powi(2);
            if !(det > 0.0) {
                return Err(AnalysisError::SingularCovariance(det));
            }
            Ok(Component {
                weight: mass / n as f64,
                mean,
                covariance,
            })
        })
        .collect()
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::cloud_from_pairs;
    use approx::assert_relative_eq;

    fn two_blobs() -> Vec<[f64; 2]> {
        let mut pairs = Vec::new();
        for (cx, cy) in [(0.0, 0.0), (8.0, 8.0)] {
            for i in 0..5 {
                for j in 0..5 {
                    pairs.push([cx + i as f64 * 0.2 - 0.4, cy + j as f64 * 0.2 - 0.4]);
                }
            }
        }
        pairs
    }

    #[test]
    fn recovers_blob_means() {
        let cloud = cloud_from_pairs(&two_blobs());
        let settings = ClusterSettings {
            cluster_count: 2,
            ..ClusterSettings::default()
        };
        let mixture = GaussianMixture::fit(cloud.view(), &settings).unwrap();
        let mut means = mixture.means();
        means.sort_by(|a, b| a[0].total_cmp(&b[0]));
        assert!((means[0][0]).abs() < 1e-6 && (means[0][1]).abs() < 1e-6);
        assert!((means[1][0] - 8.0).abs() < 1e-6);
        for weight in mixture.weights() {
            assert_relative_eq!(weight, 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn outliers_score_lower() {
        let mut pairs = two_blobs();
        pairs.push([4.0, 4.0]);
        let cloud = cloud_from_pairs(&pairs);
        let settings = ClusterSettings {
            cluster_count: 2,
            ..ClusterSettings::default()
        };
        let mixture = GaussianMixture::fit(cloud.view(), &settings).unwrap();
        let scores = mixture.score_samples(cloud.view());
        let outlier = *scores.last().unwrap();
        assert!(scores[..scores.len() - 1].iter().all(|&s| s > outlier));
    }

    #[test]
    fn fewer_samples_than_components_fails() {
        let cloud = cloud_from_pairs(&[[0.0, 0.0], [1.0, 1.0]]);
        let err = GaussianMixture::fit(cloud.view(), &ClusterSettings::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData { .. }));
    }

    #[test]
    fn log_sum_exp_is_stable() {
        assert_relative_eq!(log_sum_exp(&[1000.0, 1000.0]), 1000.0 + 2f64.ln());
    }
}
