//! Small numeric helpers shared by the analyzers.

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Least-squares slope of `data` against its index (0, 1, 2, ...).
/// Returns 0.0 for fewer than two points.
pub fn linear_regression_slope(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let sum_x: f64 = (0..n).map(|i| i as f64).sum();
    let sum_y: f64 = data.iter().sum();
    let sum_xy: f64 = data.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..n).map(|i| (i * i) as f64).sum();

    let denom = n_f * sum_x2 - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    (n_f * sum_xy - sum_x * sum_y) / denom
}

/// Signed percentage distance of `value` from `base`. 0.0 when `base` is not positive.
pub fn pct_diff(value: f64, base: f64) -> f64 {
    if base <= 0.0 || !base.is_finite() || !value.is_finite() {
        return 0.0;
    }
    (value - base) / base * 100.0
}

/// -1, 0 or 1
pub fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[1.0, 2.0, 3.0]) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_slope() {
        assert!((linear_regression_slope(&[1.0, 2.0, 3.0, 4.0]) - 1.0).abs() < 1e-9);
        assert!((linear_regression_slope(&[10.0, 8.0, 6.0]) + 2.0).abs() < 1e-9);
        assert_eq!(linear_regression_slope(&[5.0]), 0.0);
    }

    #[test]
    fn test_pct_diff() {
        assert!((pct_diff(105.0, 100.0) - 5.0).abs() < 1e-9);
        assert_eq!(pct_diff(105.0, 0.0), 0.0);
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(2.0), 1);
        assert_eq!(sign(-0.1), -1);
        assert_eq!(sign(0.0), 0);
    }
}
