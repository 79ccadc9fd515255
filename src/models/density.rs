//! Log-densities for every fittable family.
//!
//! All functions take a single point and return `-inf` outside the support.
//! They never panic; invalid parameters show up as non-finite values that the
//! fitting code turns into an inapplicable fit.

use statrs::function::gamma::ln_gamma;

use crate::domain::{DistributionParams, MixtureParams};

/// `ln(sqrt(2π))`.
pub const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_7;

/// `1 / sqrt(2π)`.
const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Normal log-density.
pub fn normal_logpdf(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    -0.5 * z * z - sigma.ln() - LN_SQRT_2PI
}

/// Normal density (used by the EM responsibilities).
pub fn normal_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    INV_SQRT_2PI / sigma * (-0.5 * z * z).exp()
}

/// Log-normal log-density with location 0, shape `s` and `scale = exp(mu_log)`.
pub fn lognormal_logpdf(x: f64, s: f64, scale: f64) -> f64 {
    if x <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let z = (x / scale).ln() / s;
    -0.5 * z * z - s.ln() - x.ln() - LN_SQRT_2PI
}

/// Exponential log-density with location 0.
pub fn exponential_logpdf(x: f64, scale: f64) -> f64 {
    if x < 0.0 {
        return f64::NEG_INFINITY;
    }
    -scale.ln() - x / scale
}

/// Gamma log-density with location 0.
pub fn gamma_logpdf(x: f64, shape: f64, scale: f64) -> f64 {
    if x < 0.0 {
        return f64::NEG_INFINITY;
    }
    if x == 0.0 {
        if shape < 1.0 {
            return f64::INFINITY;
        }
        if shape > 1.0 {
            return f64::NEG_INFINITY;
        }
        return -scale.ln();
    }
    (shape - 1.0) * x.ln() - x / scale - ln_gamma(shape) - shape * scale.ln()
}

/// Weibull log-density with location 0.
pub fn weibull_logpdf(x: f64, shape: f64, scale: f64) -> f64 {
    if x < 0.0 {
        return f64::NEG_INFINITY;
    }
    if x == 0.0 {
        if shape < 1.0 {
            return f64::INFINITY;
        }
        if shape > 1.0 {
            return f64::NEG_INFINITY;
        }
        return -scale.ln();
    }
    let y = x / scale;
    shape.ln() - scale.ln() + (shape - 1.0) * y.ln() - y.powf(shape)
}

/// Johnson Su log-density.
///
/// `z = gamma + delta * asinh((x - loc) / scale)` is standard normal.
pub fn johnson_su_logpdf(x: f64, gamma: f64, delta: f64, loc: f64, scale: f64) -> f64 {
    let y = (x - loc) / scale;
    let z = gamma + delta * y.asinh();
    delta.ln() - scale.ln() - LN_SQRT_2PI - 0.5 * (1.0 + y * y).ln() - 0.5 * z * z
}

/// `ln(cosh(u))` without overflow for large `|u|`.
fn ln_cosh(u: f64) -> f64 {
    let a = u.abs();
    a + (-2.0 * a).exp().ln_1p() - std::f64::consts::LN_2
}

/// Sinh-arcsinh (SHASH) log-density.
pub fn shash_logpdf(x: f64, mu: f64, sigma: f64, nu: f64, tau: f64) -> f64 {
    let z = (x - mu) / sigma;
    let u = nu + tau * z;
    let s = u.sinh();
    -LN_SQRT_2PI - sigma.ln() - 0.5 * (1.0 + z * z).ln() + tau.ln() + ln_cosh(u) - 0.5 * s * s
}

/// Normal mixture density.
pub fn mixture_pdf(x: f64, weights: &[f64], means: &[f64], stds: &[f64]) -> f64 {
    weights
        .iter()
        .zip(means.iter().zip(stds.iter()))
        .map(|(&w, (&m, &s))| w * normal_pdf(x, m, s))
        .sum()
}

/// Sum of log-densities over a sample.
pub fn log_likelihood<F: Fn(f64) -> f64>(values: &[f64], logpdf: F) -> f64 {
    values.iter().map(|&x| logpdf(x)).sum()
}

impl MixtureParams {
    pub fn log_density(&self, x: f64) -> f64 {
        mixture_pdf(x, &self.weights, &self.means, &self.stds).ln()
    }
}

impl DistributionParams {
    /// Log-density of the fitted distribution at `x`.
    pub fn log_density(&self, x: f64) -> f64 {
        match self {
            DistributionParams::Normal { mu, sigma } => normal_logpdf(x, *mu, *sigma),
            DistributionParams::LogNormal { s, scale } => lognormal_logpdf(x, *s, *scale),
            DistributionParams::Exponential { scale } => exponential_logpdf(x, *scale),
            DistributionParams::Gamma { shape, scale, .. } => gamma_logpdf(x, *shape, *scale),
            DistributionParams::Weibull { shape, scale } => weibull_logpdf(x, *shape, *scale),
            DistributionParams::Johnson {
                gamma,
                delta,
                loc,
                scale,
                ..
            } => johnson_su_logpdf(x, *gamma, *delta, *loc, *scale),
            DistributionParams::Shash { mu, sigma, nu, tau } => shash_logpdf(x, *mu, *sigma, *nu, *tau),
            DistributionParams::NormalMixture(m) => m.log_density(x),
        }
    }

    /// Density of the fitted distribution at `x`.
    pub fn density(&self, x: f64) -> f64 {
        self.log_density(x).exp()
    }
}
