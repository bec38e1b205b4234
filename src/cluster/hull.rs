use crate::error::{AnalysisError, Result};

const AREA_EPSILON: f64 = 1e-12;

/// Convex hull by Andrew's monotone chain, counter-clockwise, without
/// collinear boundary points.
pub fn convex_hull(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<[f64; 2]> = Vec::new();
    for &point in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], point) <= 0.0 {
            lower.pop();
        }
        lower.push(point);
    }
    let mut upper: Vec<[f64; 2]> = Vec::new();
    for &point in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], point) <= 0.0 {
            upper.pop();
        }
        upper.push(point);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Area enclosed by the convex hull of `points`.
pub fn hull_area(points: &[[f64; 2]]) -> Result<f64> {
    let hull = convex_hull(points);
    if hull.len() < 3 {
        return Err(AnalysisError::DegenerateHull);
    }
    let area = shoelace(&hull);
    if area <= AREA_EPSILON {
        return Err(AnalysisError::DegenerateHull);
    }
    Ok(area)
}

fn shoelace(polygon: &[[f64; 2]]) -> f64 {
    let twice: f64 = polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(a, b)| a[0] * b[1] - b[0] * a[1])
        .sum();
    twice.abs() / 2.0
}

fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn interior_points_are_dropped() {
        let hull = convex_hull(&[[0.0, 0.0], [2.0, 0.0], [1.0, 1.0], [2.0, 2.0], [0.0, 2.0], [1.0, 0.0]]);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&[1.0, 1.0]));
        assert!(!hull.contains(&[1.0, 0.0]));
    }

    #[test]
    fn triangle_area() {
        assert_relative_eq!(hull_area(&[[0.0, 0.0], [4.0, 0.0], [0.0, 3.0]]).unwrap(), 6.0);
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let err = hull_area(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]).unwrap_err();
        assert_eq!(err, AnalysisError::DegenerateHull);
    }
}
