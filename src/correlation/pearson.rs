// Pearson correlation over paired observations.
//
// Too little data is a result, not an error: the coefficient is None and the
// sample size says why.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Below this a centred sum of squares counts as zero variance.
const VARIANCE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub metric_a: String,
    pub metric_b: String,
    /// None when fewer than two pairs exist or either side is constant
    pub coefficient: Option<f64>,
    /// Number of paired non-null observations
    pub sample_size: usize,
}

impl CorrelationResult {
    pub fn is_defined(&self) -> bool {
        self.coefficient.is_some()
    }
}

/// Pearson's r of two equally long series.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    if sxx < VARIANCE_EPSILON || syy < VARIANCE_EPSILON {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Correlate two keyed series over the keys present in both.
pub fn correlate_keyed<K: Ord>(
    metric_a: &str,
    metric_b: &str,
    a: &BTreeMap<K, f64>,
    b: &BTreeMap<K, f64>,
) -> CorrelationResult {
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .filter_map(|(key, &x)| b.get(key).map(|&y| (x, y)))
        .unzip();

    CorrelationResult {
        metric_a: metric_a.to_string(),
        metric_b: metric_b.to_string(),
        coefficient: pearson(&xs, &ys),
        sample_size: xs.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_positive_and_negative() {
        let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_pair_is_undefined() {
        assert_eq!(pearson(&[1.0], &[1.0]), None);
        assert_eq!(pearson(&[], &[]), None);
    }

    #[test]
    fn test_constant_series_is_undefined() {
        assert_eq!(pearson(&[0.5, 0.5, 0.5], &[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn test_symmetry() {
        let x = [0.3, 1.7, 2.2, 5.0, 4.1];
        let y = [10.0, 7.0, 9.5, 1.0, 3.3];
        assert_eq!(pearson(&x, &y), pearson(&y, &x));
    }

    #[test]
    fn test_keyed_uses_intersection() {
        let a: BTreeMap<&str, f64> = [("x", 1.0), ("y", 2.0), ("z", 3.0)].into();
        let b: BTreeMap<&str, f64> = [("y", 4.0), ("z", 6.0), ("w", 0.0)].into();
        let result = correlate_keyed("a", "b", &a, &b);
        assert_eq!(result.sample_size, 2);
        assert!((result.coefficient.unwrap() - 1.0).abs() < 1e-12);
    }
}
