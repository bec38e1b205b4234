//! Clustering primitives over 2-D point clouds stored as `n × 2` arrays.

pub mod gmm;
pub mod hull;
pub mod kmeans;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

pub use gmm::GaussianMixture;
pub use hull::{convex_hull, hull_area};
pub use kmeans::KMeans;

/// Shared by the density filter and the hull-area metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    pub cluster_count: usize,
    pub seed: u64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            cluster_count: 6,
            seed: 42,
            max_iterations: 100,
            tolerance: 1e-3,
        }
    }
}

pub(crate) fn squared_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

pub(crate) fn row(points: &ArrayView2<f64>, idx: usize) -> [f64; 2] {
    [points[[idx, 0]], points[[idx, 1]]]
}

/// Number of pairwise-distinct rows.
pub(crate) fn distinct_rows(points: &ArrayView2<f64>) -> usize {
    let mut keys: Vec<(u64, u64)> = (0..points.nrows())
        .map(|idx| {
            let [x, y] = row(points, idx);
            (x.to_bits(), y.to_bits())
        })
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys.len()
}

pub fn cloud_from_pairs(pairs: &[[f64; 2]]) -> Array2<f64> {
    let mut cloud = Array2::zeros((pairs.len(), 2));
    for (idx, [x, y]) in pairs.iter().enumerate() {
        cloud[[idx, 0]] = *x;
        cloud[[idx, 1]] = *y;
    }
    cloud
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_distinct_rows() {
        let cloud = cloud_from_pairs(&[[1.0, 2.0], [1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(distinct_rows(&cloud.view()), 2);
        assert_eq!(row(&cloud.view(), 2), [3.0, 4.0]);
    }
}
