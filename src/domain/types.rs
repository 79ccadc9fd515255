//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON
//! - rendered by the text report and the ASCII plot

use clap::ValueEnum;
use serde::Serialize;

use crate::error::AppError;
use crate::math::{mean, population_std, sample_std};

/// One of the nine fittable distribution families.
///
/// The order of variants is the catalog order used for reporting and for
/// breaking AICc ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ValueEnum)]
pub enum Distribution {
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "LogNormal")]
    LogNormal,
    #[serde(rename = "Exponential")]
    Exponential,
    #[serde(rename = "Gamma")]
    Gamma,
    #[serde(rename = "Weibull")]
    Weibull,
    /// Best of Johnson Su / Sb, always reported as "Johnson Sb".
    #[serde(rename = "Johnson Sb")]
    Johnson,
    #[serde(rename = "SHASH")]
    Shash,
    #[serde(rename = "Mixture of 2 Normals")]
    Mixture2,
    #[serde(rename = "Mixture of 3 Normals")]
    Mixture3,
}

impl Distribution {
    pub const ALL: [Distribution; 9] = [
        Distribution::Normal,
        Distribution::LogNormal,
        Distribution::Exponential,
        Distribution::Gamma,
        Distribution::Weibull,
        Distribution::Johnson,
        Distribution::Shash,
        Distribution::Mixture2,
        Distribution::Mixture3,
    ];

    /// Label used in reports and in the `name -> AICc` mapping.
    pub fn display_name(self) -> &'static str {
        match self {
            Distribution::Normal => "Normal",
            Distribution::LogNormal => "LogNormal",
            Distribution::Exponential => "Exponential",
            Distribution::Gamma => "Gamma",
            Distribution::Weibull => "Weibull",
            Distribution::Johnson => "Johnson Sb",
            Distribution::Shash => "SHASH",
            Distribution::Mixture2 => "Mixture of 2 Normals",
            Distribution::Mixture3 => "Mixture of 3 Normals",
        }
    }

    /// Parameter count `k` used by the AICc penalty.
    pub fn param_count(self) -> usize {
        match self {
            Distribution::Exponential => 1,
            Distribution::Normal
            | Distribution::LogNormal
            | Distribution::Gamma
            | Distribution::Weibull => 2,
            Distribution::Johnson | Distribution::Shash => 4,
            Distribution::Mixture2 => 5,
            Distribution::Mixture3 => 8,
        }
    }
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Which Gamma estimator produced the reported parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GammaMethod {
    /// Maximum likelihood with location fixed at zero.
    MaximumLikelihood,
    /// Method of moments.
    Moments,
    /// Direct bounded minimization of the negative log-likelihood.
    NumericMinimization,
}

impl GammaMethod {
    pub fn label(self) -> &'static str {
        match self {
            GammaMethod::MaximumLikelihood => "MLE",
            GammaMethod::Moments => "moments",
            GammaMethod::NumericMinimization => "numeric MLE",
        }
    }
}

/// Which Johnson sub-family won the Su/Sb comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JohnsonVariant {
    Su,
    Sb,
}

/// Parameters of a fitted normal mixture, in component order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixtureParams {
    pub weights: Vec<f64>,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
    /// Whether EM met its tolerance before the iteration cap.
    pub converged: bool,
}

impl MixtureParams {
    pub fn components(&self) -> usize {
        self.weights.len()
    }
}

/// Distribution-specific parameter record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum DistributionParams {
    Normal {
        mu: f64,
        sigma: f64,
    },
    LogNormal {
        /// Standard deviation of `ln x`.
        s: f64,
        /// `exp(mean(ln x))`.
        scale: f64,
    },
    Exponential {
        scale: f64,
    },
    Gamma {
        shape: f64,
        scale: f64,
        method: GammaMethod,
    },
    Weibull {
        shape: f64,
        scale: f64,
    },
    Johnson {
        variant: JohnsonVariant,
        gamma: f64,
        delta: f64,
        loc: f64,
        scale: f64,
    },
    Shash {
        mu: f64,
        sigma: f64,
        nu: f64,
        tau: f64,
    },
    NormalMixture(MixtureParams),
}

/// A successful fit: parameters, maximized log-likelihood and (possibly
/// calibrated) AICc.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedDistribution {
    pub params: DistributionParams,
    pub log_likelihood: f64,
    pub aicc: f64,
}

/// Outcome of fitting one distribution to one sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Fit {
    Applicable(FittedDistribution),
    /// Precondition failed or the fit broke down numerically.
    Inapplicable,
}

impl Fit {
    /// Build a fit from a maximized log-likelihood.
    ///
    /// Yields `Inapplicable` when the log-likelihood or the resulting AICc is
    /// not finite (including `n - k - 1 <= 0`).
    pub fn from_log_likelihood(params: DistributionParams, log_likelihood: f64, k: usize, n: usize) -> Fit {
        match crate::fit::aicc::calculate_aicc(log_likelihood, k, n) {
            Some(aicc) => Fit::Applicable(FittedDistribution {
                params,
                log_likelihood,
                aicc,
            }),
            None => Fit::Inapplicable,
        }
    }

    /// AICc, or `+inf` when inapplicable.
    pub fn aicc(&self) -> f64 {
        match self {
            Fit::Applicable(f) => f.aicc,
            Fit::Inapplicable => f64::INFINITY,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Fit::Applicable(_))
    }

    pub fn fitted(&self) -> Option<&FittedDistribution> {
        match self {
            Fit::Applicable(f) => Some(f),
            Fit::Inapplicable => None,
        }
    }

    pub fn params(&self) -> Option<&DistributionParams> {
        self.fitted().map(|f| &f.params)
    }

    /// Add a constant to the AICc of an applicable fit.
    pub fn with_aicc_offset(self, offset: f64) -> Fit {
        match self {
            Fit::Applicable(mut f) => {
                f.aicc += offset;
                Fit::Applicable(f)
            }
            Fit::Inapplicable => Fit::Inapplicable,
        }
    }
}

/// Summary statistics of a sample, computed once per analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleStats {
    pub n: usize,
    pub mean: f64,
    /// Population standard deviation (ddof = 0); used by every fit heuristic.
    pub std: f64,
    /// Sample standard deviation (ddof = 1); display only.
    pub sample_std: f64,
    pub min: f64,
    pub max: f64,
}

impl SampleStats {
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// A non-empty, finite sample. Read-only to the engine.
#[derive(Debug, Clone)]
pub struct Sample {
    values: Vec<f64>,
    stats: SampleStats,
}

impl Sample {
    pub fn new(values: Vec<f64>) -> Result<Self, AppError> {
        if values.is_empty() {
            return Err(AppError::data("Cannot fit distributions to an empty sample."));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(AppError::data(format!(
                "Sample contains a non-finite value at position {pos}."
            )));
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let stats = SampleStats {
            n: values.len(),
            mean: mean(&values),
            std: population_std(&values),
            sample_std: sample_std(&values),
            min,
            max,
        };

        Ok(Self { values, stats })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn stats(&self) -> &SampleStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn all_positive(&self) -> bool {
        self.stats.min > 0.0
    }

    pub fn all_non_negative(&self) -> bool {
        self.stats.min >= 0.0
    }
}

/// Settings for the mixture EM routine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmConfig {
    /// Hard cap on EM iterations per restart.
    pub max_iter: usize,
    /// Convergence tolerance on the log-likelihood change.
    pub tol: f64,
}

impl Default for EmConfig {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-6,
        }
    }
}

/// Settings for the bounded L-BFGS minimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerConfig {
    /// Hard cap on optimizer iterations.
    pub max_iter: u64,
    /// Gradient-norm tolerance.
    pub tol: f64,
    /// Number of correction pairs kept for the inverse Hessian.
    pub m: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tol: 1e-6,
            m: 10,
        }
    }
}

/// Engine configuration. Calibration constants are deliberately not part of it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineConfig {
    pub em: EmConfig,
    pub optimizer: OptimizerConfig,
}
