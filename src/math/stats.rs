//! Descriptive statistics over plain slices.
//!
//! `population_std` divides by `n`; `percentile` interpolates linearly between
//! order statistics.

/// Arithmetic mean. Returns NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (ddof = 0).
pub fn population_variance(values: &[f64]) -> f64 {
    let m = mean(values);
    if !m.is_finite() {
        return f64::NAN;
    }
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation (ddof = 0).
pub fn population_std(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}

/// Sample standard deviation (ddof = 1). NaN when fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (n as f64 - 1.0)).sqrt()
}

/// Percentile `p` in `[0, 100]` with linear interpolation between order statistics.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn percentile_interpolates_like_linear_method() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert_abs_diff_eq!(percentile(&v, 0.0), 1.0);
        assert_abs_diff_eq!(percentile(&v, 100.0), 4.0);
        assert_abs_diff_eq!(percentile(&v, 50.0), 2.5);
        // rank = 0.33 * 3 = 0.99
        assert_abs_diff_eq!(percentile(&v, 33.0), 1.99, epsilon = 1e-12);
    }

    #[test]
    fn std_conventions() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_abs_diff_eq!(population_std(&v), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sample_std(&v), (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
        assert!(sample_std(&[1.0]).is_nan());
        assert!(mean(&[]).is_nan());
    }
}
