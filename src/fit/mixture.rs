//! Multi-start EM for univariate Gaussian mixtures.
//!
//! Every fit runs two deterministic restarts:
//!
//! - means at sample percentiles (33/67 for two components, 25/50/75 for three)
//! - means spread around the global mean in steps of one global std
//!
//! Both restarts use uniform weights and `std/2` component widths. A restart is
//! discarded as soon as it degenerates (a point no component explains, a
//! component losing all its mass, a vanishing mixture density). The surviving
//! restart with the highest log-likelihood wins.

use crate::domain::EmConfig;
use crate::fit::selection::keep_best;
use crate::math::{mean, percentile, population_std};
use crate::models::{mixture_pdf, normal_pdf};

/// Mass/density threshold below which a restart is considered degenerate.
const MIN_MASS: f64 = 1e-10;

/// Minimum effective number of points a component must keep.
const MIN_COMPONENT_MASS: f64 = 1.0;

/// Variance floor as a fraction of the global std.
const VARIANCE_FLOOR_FRACTION: f64 = 0.01;

/// Result of the best EM restart.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureFit {
    pub weights: Vec<f64>,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
    pub converged: bool,
    pub log_likelihood: f64,
    pub iterations: usize,
}

/// Fit a `k`-component normal mixture to `values`.
///
/// Returns `None` when the sample has no spread or every restart degenerates.
pub fn fit_normal_mixture(values: &[f64], k: usize, config: &EmConfig) -> Option<MixtureFit> {
    if k == 0 || values.is_empty() {
        return None;
    }
    let global_mean = mean(values);
    let global_std = population_std(values);
    if !(global_std.is_finite() && global_std > 0.0) {
        return None;
    }

    let restarts = initial_means(values, k, global_mean, global_std)
        .into_iter()
        .enumerate()
        .map(|(restart, means)| {
            let fit = run_em(values, means, global_std, config);
            match &fit {
                Some(f) => tracing::debug!(
                    k,
                    restart,
                    ll = f.log_likelihood,
                    iterations = f.iterations,
                    converged = f.converged,
                    "EM restart finished"
                ),
                None => tracing::debug!(k, restart, "EM restart degenerated"),
            }
            fit
        });

    keep_best(restarts, |f: &MixtureFit| -f.log_likelihood)
}

fn initial_means(values: &[f64], k: usize, global_mean: f64, global_std: f64) -> Vec<Vec<f64>> {
    let at_percentiles: Vec<f64> = match k {
        2 => vec![percentile(values, 33.0), percentile(values, 67.0)],
        _ => (1..=k)
            .map(|j| percentile(values, 100.0 * j as f64 / (k as f64 + 1.0)))
            .collect(),
    };

    // k=2: mean -/+ 0.5 std; k=3: mean - std, mean, mean + std.
    let centre = (k as f64 - 1.0) / 2.0;
    let spread: Vec<f64> = (0..k)
        .map(|j| global_mean + (j as f64 - centre) * global_std)
        .collect();

    vec![at_percentiles, spread]
}

fn run_em(values: &[f64], mut means: Vec<f64>, global_std: f64, config: &EmConfig) -> Option<MixtureFit> {
    let n = values.len();
    let k = means.len();
    let n_f = n as f64;

    let mut weights = vec![1.0 / k as f64; k];
    let mut stds = vec![global_std / 2.0; k];
    let variance_floor = global_std * VARIANCE_FLOOR_FRACTION;

    // Responsibilities, row-major (point, component).
    let mut resp = vec![0.0; n * k];
    let mut mass = vec![0.0; k];
    let mut prev_ll = f64::NEG_INFINITY;
    let mut ll = f64::NAN;
    let mut converged = false;
    let mut iterations = 0;

    for _ in 0..config.max_iter {
        iterations += 1;

        // E-step.
        for (i, &x) in values.iter().enumerate() {
            let row = &mut resp[i * k..(i + 1) * k];
            let mut total = 0.0;
            for j in 0..k {
                row[j] = weights[j] * normal_pdf(x, means[j], stds[j]);
                total += row[j];
            }
            if !(total > MIN_MASS) {
                return None;
            }
            for r in row.iter_mut() {
                *r /= total;
            }
        }

        // M-step.
        for (j, m) in mass.iter_mut().enumerate() {
            *m = (0..n).map(|i| resp[i * k + j]).sum();
        }
        if mass.iter().any(|&m| m < MIN_COMPONENT_MASS) {
            return None;
        }
        for j in 0..k {
            weights[j] = mass[j] / n_f;
            means[j] = values
                .iter()
                .enumerate()
                .map(|(i, &x)| resp[i * k + j] * x)
                .sum::<f64>()
                / mass[j];
            let variance = values
                .iter()
                .enumerate()
                .map(|(i, &x)| resp[i * k + j] * (x - means[j]) * (x - means[j]))
                .sum::<f64>()
                / mass[j];
            stds[j] = variance.max(variance_floor).sqrt();
        }

        // Log-likelihood of the updated mixture.
        ll = 0.0;
        for &x in values {
            let p = mixture_pdf(x, &weights, &means, &stds);
            if !(p > MIN_MASS) {
                return None;
            }
            ll += p.ln();
        }

        if (ll - prev_ll).abs() < config.tol {
            converged = true;
            break;
        }
        prev_ll = ll;
    }

    if !ll.is_finite() {
        return None;
    }

    Some(MixtureFit {
        weights,
        means,
        stds,
        converged,
        log_likelihood: ll,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SampleShape, generate_sample};

    fn bimodal(n: usize, seed: u64) -> Vec<f64> {
        let shape = SampleShape::NormalMixture {
            components: vec![(0.5, 0.0, 1.0), (0.5, 10.0, 1.0)],
        };
        generate_sample(&shape, n, seed).unwrap()
    }

    fn sorted(mut v: Vec<f64>) -> Vec<f64> {
        v.sort_by(|a, b| a.partial_cmp(b).unwrap());
        v
    }

    #[test]
    fn recovers_two_well_separated_components() {
        let data = bimodal(400, 7);
        let fit = fit_normal_mixture(&data, 2, &EmConfig::default()).unwrap();

        let means = sorted(fit.means.clone());
        assert!((means[0] - 0.0).abs() < 0.4, "means {means:?}");
        assert!((means[1] - 10.0).abs() < 0.4, "means {means:?}");
        for w in &fit.weights {
            assert!((w - 0.5).abs() < 0.1, "weights {:?}", fit.weights);
        }
        assert!((fit.weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(fit.converged);
        assert!(fit.log_likelihood.is_finite());
    }

    #[test]
    fn recovers_three_components() {
        let shape = SampleShape::NormalMixture {
            components: vec![(0.3, -10.0, 1.0), (0.4, 0.0, 1.0), (0.3, 10.0, 1.0)],
        };
        let data = generate_sample(&shape, 600, 11).unwrap();
        let fit = fit_normal_mixture(&data, 3, &EmConfig::default()).unwrap();
        let means = sorted(fit.means.clone());
        assert!((means[0] + 10.0).abs() < 0.5, "means {means:?}");
        assert!(means[1].abs() < 0.5, "means {means:?}");
        assert!((means[2] - 10.0).abs() < 0.5, "means {means:?}");
    }

    #[test]
    fn constant_sample_has_no_result() {
        let data = vec![3.0; 50];
        assert!(fit_normal_mixture(&data, 2, &EmConfig::default()).is_none());
        assert!(fit_normal_mixture(&data, 3, &EmConfig::default()).is_none());
    }

    #[test]
    fn iteration_cap_still_yields_a_state() {
        let data = bimodal(200, 3);
        let config = EmConfig { max_iter: 1, tol: 1e-12 };
        let fit = fit_normal_mixture(&data, 2, &config).unwrap();
        assert!(!fit.converged);
        assert_eq!(fit.iterations, 1);
    }

    #[test]
    fn deterministic_across_calls() {
        let data = bimodal(300, 5);
        let a = fit_normal_mixture(&data, 2, &EmConfig::default()).unwrap();
        let b = fit_normal_mixture(&data, 2, &EmConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn initial_means_follow_both_strategies() {
        let data: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        let m = mean(&data);
        let s = population_std(&data);

        let two = initial_means(&data, 2, m, s);
        assert!((two[0][0] - 33.0).abs() < 1e-9);
        assert!((two[0][1] - 67.0).abs() < 1e-9);
        assert!((two[1][0] - (m - 0.5 * s)).abs() < 1e-12);
        assert!((two[1][1] - (m + 0.5 * s)).abs() < 1e-12);

        let three = initial_means(&data, 3, m, s);
        assert_eq!(three[0], vec![25.0, 50.0, 75.0]);
        assert!((three[1][0] - (m - s)).abs() < 1e-12);
        assert!((three[1][1] - m).abs() < 1e-12);
        assert!((three[1][2] - (m + s)).abs() < 1e-12);
    }
}
