use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use super::{distinct_rows, row, squared_distance, ClusterSettings};
use crate::error::{AnalysisError, Result};

/// Lloyd's k-means seeded with k-means++.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub centroids: Vec<[f64; 2]>,
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
}

impl KMeans {
    pub fn fit(points: ArrayView2<f64>, k: usize, settings: &ClusterSettings) -> Result<Self> {
        let distinct = distinct_rows(&points);
        if k == 0 || distinct < k {
            return Err(AnalysisError::InsufficientData {
                required: k.max(1),
                actual: distinct,
            });
        }
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let mut centroids = plus_plus_init(&points, k, &mut rng);
        let threshold = settings.tolerance * mean_variance(&points);

        let mut labels = vec![0; points.nrows()];
        let mut iterations = 0;
        while iterations < settings.max_iterations {
            iterations += 1;
            assign(&points, &centroids, &mut labels);
            let updated = update(&points, &labels, &centroids);
            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| squared_distance(*old, *new))
                .sum();
            centroids = updated;
            if shift <= threshold {
                break;
            }
        }
        let inertia = assign(&points, &centroids, &mut labels);
        trace!(k, iterations, inertia, "k-means converged");

        Ok(Self {
            centroids,
            labels,
            inertia,
            iterations,
        })
    }

    pub fn centroid_cloud(&self) -> Array2<f64> {
        super::cloud_from_pairs(&self.centroids)
    }
}

fn plus_plus_init(points: &ArrayView2<f64>, k: usize, rng: &mut StdRng) -> Vec<[f64; 2]> {
    let n = points.nrows();
    let mut centroids = vec![row(points, rng.gen_range(0..n))];
    let mut nearest: Vec<f64> = (0..n)
        .map(|idx| squared_distance(row(points, idx), centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = nearest.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut pick = None;
            for (idx, weight) in nearest.iter().enumerate().filter(|(_, w)| **w > 0.0) {
                pick = Some(idx);
                if target < *weight {
                    break;
                }
                target -= weight;
            }
            pick.unwrap_or(0)
        } else {
            rng.gen_range(0..n)
        };
        let centroid = row(points, chosen);
        for (idx, slot) in nearest.iter_mut().enumerate() {
            *slot = slot.min(squared_distance(row(points, idx), centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

/// Labels every point with its nearest centroid; returns the inertia.
fn assign(points: &ArrayView2<f64>, centroids: &[[f64; 2]], labels: &mut [usize]) -> f64 {
    let mut inertia = 0.0;
    for (idx, label) in labels.iter_mut().enumerate() {
        let point = row(points, idx);
        let (best, distance) = centroids
            .iter()
            .enumerate()
            .map(|(c, centroid)| (c, squared_distance(point, *centroid)))
            .fold((0, f64::INFINITY), |acc, cur| if cur.1 < acc.1 { cur } else { acc });
        *label = best;
        inertia += distance;
    }
    inertia
}

fn update(points: &ArrayView2<f64>, labels: &[usize], previous: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut sums = vec![[0.0; 2]; previous.len()];
    let mut counts = vec![0usize; previous.len()];
    for (idx, &label) in labels.iter().enumerate() {
        let [x, y] = row(points, idx);
        sums[label][0] += x;
        sums[label][1] += y;
        counts[label] += 1;
    }
    sums.iter()
        .zip(&counts)
        .zip(previous)
        .map(|((sum, &count), old)| {
            if count == 0 {
                *old
            } else {
                [sum[0] / count as f64, sum[1] / count as f64]
            }
        })
        .collect()
}

fn mean_variance(points: &ArrayView2<f64>) -> f64 {
    let n = points.nrows() as f64;
    (0..2)
        .map(|col| {
            let column = points.column(col);
            let mean = column.sum() / n;
            column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
        })
        .sum::<f64>()
        / 2.0
}
