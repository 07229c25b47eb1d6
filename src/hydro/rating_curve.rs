use anyhow::Result;
use ordered_float::OrderedFloat;

use crate::AppError;

/// Piecewise-linear level curve of a reservoir
///
/// Maps outflow to tailrace level, or storage to forebay level. Queries past
/// either end continue the outermost segment.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingCurve {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl RatingCurve {
    pub fn new(points: &[(f64, f64)]) -> Result<Self> {
        if points.len() < 2 {
            return Err(AppError::InvalidConfig(format!(
                "a rating curve needs at least 2 points, got {}",
                points.len()
            ))
            .into());
        }
        if let Some((x, y)) = points.iter().find(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(AppError::InvalidConfig(format!("rating curve point ({x}, {y}) is not finite")).into());
        }

        let mut sorted = points.to_vec();
        sorted.sort_unstable_by_key(|(x, _)| OrderedFloat(*x));
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(AppError::InvalidConfig(format!(
                "rating curve has two points at {}",
                pair[0].0
            ))
            .into());
        }

        let (xs, ys) = sorted.into_iter().unzip();
        Ok(Self { xs, ys })
    }

    pub fn level(&self, x: f64) -> f64 {
        let last = self.xs.len() - 1;
        let upper = self.xs.partition_point(|&xi| xi < x).clamp(1, last);
        let lower = upper - 1;

        let slope = (self.ys[upper] - self.ys[lower]) / (self.xs[upper] - self.xs[lower]);
        self.ys[lower] + slope * (x - self.xs[lower])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn curve() -> RatingCurve {
        RatingCurve::new(&[(100.0, 12.0), (0.0, 10.0), (300.0, 13.0)]).unwrap()
    }

    #[test]
    fn test_interpolates_between_points() {
        let curve = curve();
        assert_approx_eq!(f64, curve.level(0.0), 10.0, epsilon = 1e-9);
        assert_approx_eq!(f64, curve.level(50.0), 11.0, epsilon = 1e-9);
        assert_approx_eq!(f64, curve.level(100.0), 12.0, epsilon = 1e-9);
        assert_approx_eq!(f64, curve.level(200.0), 12.5, epsilon = 1e-9);
    }

    #[test]
    fn test_extrapolates_outermost_segments() {
        let curve = curve();
        assert_approx_eq!(f64, curve.level(-50.0), 9.0, epsilon = 1e-9);
        assert_approx_eq!(f64, curve.level(500.0), 14.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_degenerate_curves() {
        assert!(RatingCurve::new(&[(1.0, 1.0)]).is_err());
        assert!(RatingCurve::new(&[(1.0, 1.0), (1.0, 2.0)]).is_err());
        assert!(RatingCurve::new(&[(1.0, f64::NAN), (2.0, 2.0)]).is_err());
    }
}
