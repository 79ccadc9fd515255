//! Reproducible synthetic samples.
//!
//! Used by the `demo` command and by tests that need realistic data of a known
//! shape. Every sample is a pure function of `(shape, n, seed)`.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Exp, Gamma, LogNormal, Normal, Weibull};

use crate::error::AppError;

/// Shape of a synthetic sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleShape {
    Normal { mean: f64, std: f64 },
    /// `mu`/`sigma` of the underlying normal of `ln x`.
    LogNormal { mu: f64, sigma: f64 },
    Exponential { scale: f64 },
    Gamma { shape: f64, scale: f64 },
    Weibull { shape: f64, scale: f64 },
    /// `(weight, mean, std)` per component; weights need not sum to one.
    NormalMixture { components: Vec<(f64, f64, f64)> },
}

impl SampleShape {
    pub fn describe(&self) -> String {
        match self {
            SampleShape::Normal { mean, std } => format!("Normal(mean={mean}, std={std})"),
            SampleShape::LogNormal { mu, sigma } => format!("LogNormal(mu={mu}, sigma={sigma})"),
            SampleShape::Exponential { scale } => format!("Exponential(scale={scale})"),
            SampleShape::Gamma { shape, scale } => format!("Gamma(shape={shape}, scale={scale})"),
            SampleShape::Weibull { shape, scale } => format!("Weibull(shape={shape}, scale={scale})"),
            SampleShape::NormalMixture { components } => {
                let parts: Vec<String> = components
                    .iter()
                    .map(|(w, m, s)| format!("{w}*N({m}, {s})"))
                    .collect();
                format!("Mixture[{}]", parts.join(" + "))
            }
        }
    }
}

fn invalid(shape: &SampleShape, e: impl std::fmt::Display) -> AppError {
    AppError::usage(format!("Invalid parameters for {}: {e}", shape.describe()))
}

/// Draw `n` values of the given shape from a seeded generator.
pub fn generate_sample(shape: &SampleShape, n: usize, seed: u64) -> Result<Vec<f64>, AppError> {
    if n == 0 {
        return Err(AppError::usage("Sample size must be > 0."));
    }
    let mut rng = StdRng::seed_from_u64(seed);

    let values = match shape {
        SampleShape::Normal { mean, std } => {
            let d = Normal::new(*mean, *std).map_err(|e| invalid(shape, e))?;
            (0..n).map(|_| d.sample(&mut rng)).collect()
        }
        SampleShape::LogNormal { mu, sigma } => {
            let d = LogNormal::new(*mu, *sigma).map_err(|e| invalid(shape, e))?;
            (0..n).map(|_| d.sample(&mut rng)).collect()
        }
        SampleShape::Exponential { scale } => {
            if !(*scale > 0.0) {
                return Err(invalid(shape, "scale must be > 0"));
            }
            let d = Exp::new(1.0 / scale).map_err(|e| invalid(shape, e))?;
            (0..n).map(|_| d.sample(&mut rng)).collect()
        }
        SampleShape::Gamma { shape: k, scale } => {
            let d = Gamma::new(*k, *scale).map_err(|e| invalid(shape, e))?;
            (0..n).map(|_| d.sample(&mut rng)).collect()
        }
        SampleShape::Weibull { shape: k, scale } => {
            let d = Weibull::new(*scale, *k).map_err(|e| invalid(shape, e))?;
            (0..n).map(|_| d.sample(&mut rng)).collect()
        }
        SampleShape::NormalMixture { components } => sample_mixture(shape, components, n, &mut rng)?,
    };

    Ok(values)
}

fn sample_mixture(
    shape: &SampleShape,
    components: &[(f64, f64, f64)],
    n: usize,
    rng: &mut StdRng,
) -> Result<Vec<f64>, AppError> {
    let total: f64 = components.iter().map(|c| c.0).sum();
    if components.is_empty() || !(total > 0.0) || components.iter().any(|c| c.0 < 0.0) {
        return Err(invalid(shape, "mixture weights must be non-negative with a positive sum"));
    }
    let normals = components
        .iter()
        .map(|&(_, m, s)| Normal::new(m, s).map_err(|e| invalid(shape, e)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let u = rng.gen_range(0.0..total);
        let mut acc = 0.0;
        let mut idx = components.len() - 1;
        for (j, c) in components.iter().enumerate() {
            acc += c.0;
            if u < acc {
                idx = j;
                break;
            }
        }
        out.push(normals[idx].sample(rng));
    }
    Ok(out)
}
