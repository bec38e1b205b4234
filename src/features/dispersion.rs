//! Spread of a 2-D point cloud: covariance-determinant dispersion (AAVS)
//! and the area spanned by cluster centroids.

use ndarray::{Array2, ArrayView2, Axis};

use crate::cluster::{self, ClusterSettings, KMeans};
use crate::error::{AnalysisError, Result};

/// Relative determinant below which the covariance counts as singular.
const SINGULAR_RATIO: f64 = 1e-10;

/// Sample (n - 1) covariance of an `n × 2` cloud.
pub fn covariance(cloud: ArrayView2<f64>) -> Result<Array2<f64>> {
    let n = cloud.nrows();
    if n < 2 {
        return Err(AnalysisError::InsufficientData {
            required: 2,
            actual: n,
        });
    }
    let mean = cloud
        .mean_axis(Axis(0))
        .ok_or(AnalysisError::InsufficientData { required: 2, actual: n })?;
    let centered = &cloud - &mean;
    Ok(centered.t().dot(&centered) / (n as f64 - 1.0))
}

/// `sqrt(det(cov))`. Collinear or constant clouds report a singular
/// covariance instead of a zero score.
pub fn aavs(cloud: ArrayView2<f64>) -> Result<f64> {
    let cov = covariance(cloud)?;
    let det = cov[[0, 0]] * cov[[1, 1]] - cov[[0, 1]] * cov[[1, 0]];
    let scale = cov[[0, 0]] * cov[[1, 1]];
    if !(det > SINGULAR_RATIO * scale) || !det.is_finite() {
        return Err(AnalysisError::SingularCovariance(det));
    }
    Ok(det.sqrt())
}

/// Area of the convex hull over `settings.cluster_count` k-means centroids.
pub fn hull_area(cloud: ArrayView2<f64>, settings: &ClusterSettings) -> Result<f64> {
    let fitted = KMeans::fit(cloud, settings.cluster_count, settings)?;
    cluster::hull_area(&fitted.centroids)
}
