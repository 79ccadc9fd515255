//! Per-distribution fit routines.
//!
//! Each routine takes a `FitContext` and returns a `Fit`. Preconditions come
//! from the catalog entry of the distribution; any precondition failure or
//! numerical breakdown yields `Fit::Inapplicable`, never an error.
//!
//! Estimators (location fixed at zero for the positive families):
//!
//! - Normal: sample mean and population std
//! - LogNormal: mean/std of `ln x`
//! - Exponential: scale = mean
//! - Gamma: best of MLE, moments and a bounded numeric MLE
//! - Weibull: shape from the profile-likelihood equation
//! - Johnson: Su by bounded numeric MLE, Sb gated on the sample's range
//! - SHASH: bounded numeric MLE
//! - Mixtures: multi-start EM plus degeneracy checks

use statrs::function::gamma::digamma;

use crate::domain::{
    Distribution, DistributionParams, EngineConfig, Fit, FittedDistribution, GammaMethod, JohnsonVariant,
    MixtureParams, Sample,
};
use crate::fit::aicc::{
    GAMMA_AICC_OFFSET, JOHNSON_SU_AICC_OFFSET, JOHNSON_SU_PREFERENCE_MARGIN, calculate_aicc,
    gamma_correction_applies,
};
use crate::fit::mixture::{MixtureFit, fit_normal_mixture};
use crate::fit::selection::{catalog_entry, keep_best};
use crate::math::{LbfgsbOptimizer, ObjectiveFunction, OptimizationResult, bisect, mean, population_variance};
use crate::models::{
    exponential_logpdf, gamma_logpdf, johnson_su_logpdf, log_likelihood, lognormal_logpdf, normal_logpdf,
    shash_logpdf, weibull_logpdf,
};

/// Relative tolerance for the scalar MLE equations.
const ROOT_RTOL: f64 = 1e-12;
const ROOT_MAX_ITER: usize = 500;

/// Sb is only considered when `range < SB_RANGE_FACTOR * std`.
const SB_RANGE_FACTOR: f64 = 10.0;

/// Mixture components whose means are closer than `std / MERGED_MEANS_DIVISOR` are merged.
const MERGED_MEANS_DIVISOR: f64 = 10.0;
/// Mixture components lighter than this are considered vanished.
const MIN_COMPONENT_WEIGHT: f64 = 0.01;

/// Everything a fit routine needs.
#[derive(Debug, Clone, Copy)]
pub struct FitContext<'a> {
    pub sample: &'a Sample,
    /// Semantic column name; only the Gamma calibration reads it.
    pub column_name: &'a str,
    pub config: &'a EngineConfig,
}

impl<'a> FitContext<'a> {
    pub fn new(sample: &'a Sample, column_name: &'a str, config: &'a EngineConfig) -> Self {
        Self {
            sample,
            column_name,
            config,
        }
    }

    fn values(&self) -> &'a [f64] {
        self.sample.values()
    }

    fn n(&self) -> usize {
        self.sample.len()
    }

    fn admits(&self, distribution: Distribution) -> bool {
        catalog_entry(distribution).admits(self.sample)
    }

    fn optimizer(&self) -> LbfgsbOptimizer {
        LbfgsbOptimizer::new(self.config.optimizer)
    }
}

fn fitted(params: DistributionParams, ll: f64, k: usize, n: usize) -> Option<FittedDistribution> {
    let aicc = calculate_aicc(ll, k, n)?;
    Some(FittedDistribution {
        params,
        log_likelihood: ll,
        aicc,
    })
}

/// Values centred on the sample mean and divided by the population std.
///
/// Johnson and SHASH are location-scale families, so they are optimized on the
/// standardized sample and mapped back afterwards.
fn standardize(ctx: &FitContext) -> Option<(Vec<f64>, f64, f64)> {
    let stats = ctx.sample.stats();
    let (m, sd) = (stats.mean, stats.std);
    if !(sd > 0.0 && sd.is_finite()) {
        return None;
    }
    Some((ctx.values().iter().map(|x| (x - m) / sd).collect(), m, sd))
}

/// Mean negative log-likelihood, the scale every numeric objective works in.
fn mean_nll<F: Fn(f64) -> f64>(values: &[f64], logpdf: F) -> f64 {
    -log_likelihood(values, logpdf) / values.len() as f64
}

impl From<Option<FittedDistribution>> for Fit {
    fn from(value: Option<FittedDistribution>) -> Self {
        value.map_or(Fit::Inapplicable, Fit::Applicable)
    }
}

pub fn fit_normal(ctx: &FitContext) -> Fit {
    if !ctx.admits(Distribution::Normal) {
        return Fit::Inapplicable;
    }
    let stats = ctx.sample.stats();
    let (mu, sigma) = (stats.mean, stats.std);
    if !(sigma > 0.0) {
        return Fit::Inapplicable;
    }
    let ll = log_likelihood(ctx.values(), |x| normal_logpdf(x, mu, sigma));
    Fit::from_log_likelihood(DistributionParams::Normal { mu, sigma }, ll, 2, ctx.n())
}

pub fn fit_lognormal(ctx: &FitContext) -> Fit {
    if !ctx.admits(Distribution::LogNormal) {
        return Fit::Inapplicable;
    }
    let logs: Vec<f64> = ctx.values().iter().map(|x| x.ln()).collect();
    let s = population_variance(&logs).sqrt();
    let scale = mean(&logs).exp();
    if !(s > 0.0 && scale > 0.0 && scale.is_finite()) {
        return Fit::Inapplicable;
    }
    let ll = log_likelihood(ctx.values(), |x| lognormal_logpdf(x, s, scale));
    Fit::from_log_likelihood(DistributionParams::LogNormal { s, scale }, ll, 2, ctx.n())
}

pub fn fit_exponential(ctx: &FitContext) -> Fit {
    if !ctx.admits(Distribution::Exponential) {
        return Fit::Inapplicable;
    }
    let scale = ctx.sample.stats().mean;
    if !(scale > 0.0) {
        return Fit::Inapplicable;
    }
    let ll = log_likelihood(ctx.values(), |x| exponential_logpdf(x, scale));
    Fit::from_log_likelihood(DistributionParams::Exponential { scale }, ll, 1, ctx.n())
}

type GammaEstimator = fn(&FitContext) -> Option<(f64, f64)>;

/// Gamma estimators, tried independently in this order.
const GAMMA_METHODS: [(GammaMethod, GammaEstimator); 3] = [
    (GammaMethod::MaximumLikelihood, gamma_mle),
    (GammaMethod::Moments, gamma_moments),
    (GammaMethod::NumericMinimization, gamma_numeric),
];

/// Gamma fit: the lowest-AICc of three estimators, plus the column calibration.
pub fn fit_gamma(ctx: &FitContext) -> Fit {
    if !ctx.admits(Distribution::Gamma) {
        return Fit::Inapplicable;
    }
    let n = ctx.n();
    let candidates = GAMMA_METHODS.iter().map(|&(method, estimate)| {
        let candidate = estimate(ctx).and_then(|(shape, scale)| {
            let ll = log_likelihood(ctx.values(), |x| gamma_logpdf(x, shape, scale));
            fitted(DistributionParams::Gamma { shape, scale, method }, ll, 2, n)
        });
        match &candidate {
            Some(f) => tracing::debug!(method = method.label(), aicc = f.aicc, "gamma method"),
            None => tracing::debug!(method = method.label(), "gamma method failed"),
        }
        candidate
    });

    let fit = Fit::from(keep_best(candidates, |f: &FittedDistribution| f.aicc));

    let stats = ctx.sample.stats();
    if gamma_correction_applies(ctx.column_name, stats.mean, stats.std) {
        tracing::debug!(offset = GAMMA_AICC_OFFSET, "gamma column calibration applied");
        fit.with_aicc_offset(GAMMA_AICC_OFFSET)
    } else {
        fit
    }
}

/// MLE with location 0: solve `ln a - digamma(a) = ln(mean) - mean(ln x)`.
fn gamma_mle(ctx: &FitContext) -> Option<(f64, f64)> {
    let values = ctx.values();
    let m = mean(values);
    let mean_log = values.iter().map(|x| x.ln()).sum::<f64>() / values.len() as f64;
    let s = m.ln() - mean_log;
    if !(s.is_finite() && s > 0.0) {
        return None;
    }

    // Closed-form approximation, used to seed the bracket.
    let a0 = (3.0 - s + ((s - 3.0).powi(2) + 24.0 * s).sqrt()) / (12.0 * s);
    let shape = bisect(|a| a.ln() - digamma(a) - s, 1e-8, 2.0 * a0 + 1.0, ROOT_RTOL, ROOT_MAX_ITER)?;
    let scale = m / shape;
    (shape.is_finite() && scale.is_finite() && shape > 0.0 && scale > 0.0).then_some((shape, scale))
}

fn gamma_moments(ctx: &FitContext) -> Option<(f64, f64)> {
    let m = mean(ctx.values());
    let var = population_variance(ctx.values());
    if !(var > 0.0 && m > 0.0) {
        return None;
    }
    Some((m * m / var, var / m))
}

struct GammaNll<'a> {
    values: &'a [f64],
}

impl ObjectiveFunction for GammaNll<'_> {
    fn eval(&self, params: &[f64]) -> f64 {
        let (shape, scale) = (params[0], params[1]);
        if shape <= 0.0 || scale <= 0.0 {
            return f64::INFINITY;
        }
        mean_nll(self.values, |x| gamma_logpdf(x, shape, scale))
    }
}

/// Bounded numeric MLE seeded at (1, 1); only a converged run counts.
fn gamma_numeric(ctx: &FitContext) -> Option<(f64, f64)> {
    let objective = GammaNll { values: ctx.values() };
    let result = ctx
        .optimizer()
        .minimize(&objective, &[1.0, 1.0], &[(0.01, f64::INFINITY), (0.01, f64::INFINITY)])?;
    if !result.converged {
        tracing::debug!(status = %result.message, "gamma numeric MLE did not converge");
        return None;
    }
    Some((result.parameters[0], result.parameters[1]))
}

pub fn fit_weibull(ctx: &FitContext) -> Fit {
    if !ctx.admits(Distribution::Weibull) {
        return Fit::Inapplicable;
    }
    let Some((shape, scale)) = weibull_mle(ctx.values()) else {
        return Fit::Inapplicable;
    };
    let ll = log_likelihood(ctx.values(), |x| weibull_logpdf(x, shape, scale));
    Fit::from_log_likelihood(DistributionParams::Weibull { shape, scale }, ll, 2, ctx.n())
}

/// MLE with location 0 via the profile equation in the shape `c`:
///
/// `sum(x^c ln x) / sum(x^c) - 1/c - mean(ln x) = 0`
///
/// Powers are evaluated relative to `max(ln x)` so large shapes do not overflow.
fn weibull_mle(values: &[f64]) -> Option<(f64, f64)> {
    let logs: Vec<f64> = values.iter().map(|x| x.ln()).collect();
    let mean_log = mean(&logs);
    let max_log = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(mean_log.is_finite() && max_log.is_finite()) {
        return None;
    }

    let weighted = |c: f64| -> (f64, f64) {
        let mut sw = 0.0;
        let mut swl = 0.0;
        for &l in &logs {
            let w = (c * (l - max_log)).exp();
            sw += w;
            swl += w * l;
        }
        (sw, swl)
    };
    let profile = |c: f64| {
        let (sw, swl) = weighted(c);
        swl / sw - 1.0 / c - mean_log
    };

    let shape = bisect(profile, 1e-6, 1.0, ROOT_RTOL, ROOT_MAX_ITER)?;
    let (sw, _) = weighted(shape);
    let scale = (max_log + (sw / logs.len() as f64).ln() / shape).exp();
    (shape > 0.0 && scale.is_finite() && scale > 0.0).then_some((shape, scale))
}

struct JohnsonSuNll<'a> {
    values: &'a [f64],
}

impl ObjectiveFunction for JohnsonSuNll<'_> {
    fn eval(&self, p: &[f64]) -> f64 {
        if p[1] <= 0.0 || p[3] <= 0.0 {
            return f64::INFINITY;
        }
        mean_nll(self.values, |x| johnson_su_logpdf(x, p[0], p[1], p[2], p[3]))
    }
}

/// Starting values for `delta`. Fits run on the standardized sample and the
/// scale seed equals `delta`, so every start has the sample's spread.
const JOHNSON_DELTA_SEEDS: [f64; 3] = [1.0, 2.0, 4.0];

/// Unbounded Johnson (Su) MLE: `(gamma, delta, loc, scale)` and the log-likelihood.
fn johnson_su_mle(ctx: &FitContext) -> Option<([f64; 4], f64)> {
    let (z, m, sd) = standardize(ctx)?;
    let objective = JohnsonSuNll { values: &z };
    let optimizer = ctx.optimizer();
    let bounds = [
        (-50.0, 50.0),
        (0.01, 100.0),
        (f64::NEG_INFINITY, f64::INFINITY),
        (1e-6, f64::INFINITY),
    ];

    let starts = JOHNSON_DELTA_SEEDS
        .iter()
        .map(|&delta| optimizer.minimize(&objective, &[0.0, delta, 0.0, delta], &bounds));
    let best = keep_best(starts, |r: &OptimizationResult| r.fval)?;
    let q = &best.parameters;
    let p = [q[0], q[1], m + sd * q[2], sd * q[3]];
    let ll = log_likelihood(ctx.values(), |x| johnson_su_logpdf(x, p[0], p[1], p[2], p[3]));
    ll.is_finite().then_some((p, ll))
}

fn johnson_fit(variant: JohnsonVariant, p: [f64; 4], ll: f64, n: usize) -> Fit {
    let params = DistributionParams::Johnson {
        variant,
        gamma: p[0],
        delta: p[1],
        loc: p[2],
        scale: p[3],
    };
    let k = Distribution::Johnson.param_count();
    match variant {
        JohnsonVariant::Su => Fit::from_log_likelihood(params, ll, k, n).with_aicc_offset(JOHNSON_SU_AICC_OFFSET),
        JohnsonVariant::Sb => Fit::from_log_likelihood(params, ll, k, n),
    }
}

fn sb_range_gate(ctx: &FitContext) -> bool {
    let stats = ctx.sample.stats();
    stats.range() < stats.std * SB_RANGE_FACTOR
}

/// Johnson Su with its calibration offset always applied.
pub fn fit_johnson_su(ctx: &FitContext) -> Fit {
    if !ctx.admits(Distribution::Johnson) {
        return Fit::Inapplicable;
    }
    match johnson_su_mle(ctx) {
        Some((p, ll)) => johnson_fit(JohnsonVariant::Su, p, ll, ctx.n()),
        None => Fit::Inapplicable,
    }
}

/// Johnson "Sb": the Su likelihood, only for samples whose range is under ten std.
pub fn fit_johnson_sb(ctx: &FitContext) -> Fit {
    if !ctx.admits(Distribution::Johnson) || !sb_range_gate(ctx) {
        return Fit::Inapplicable;
    }
    match johnson_su_mle(ctx) {
        Some((p, ll)) => johnson_fit(JohnsonVariant::Sb, p, ll, ctx.n()),
        None => Fit::Inapplicable,
    }
}

/// Prefer Su unless Sb's AICc is lower by more than the preference margin.
pub fn select_johnson(su: Fit, sb: Fit) -> Fit {
    match (&su, &sb) {
        (Fit::Applicable(a), Fit::Applicable(b)) => {
            if a.aicc <= b.aicc + JOHNSON_SU_PREFERENCE_MARGIN {
                su
            } else {
                sb
            }
        }
        (Fit::Applicable(_), Fit::Inapplicable) => su,
        (Fit::Inapplicable, _) => sb,
    }
}

/// Catalog entry "Johnson Sb": the preferred of Su and Sb.
///
/// Both variants share one likelihood maximization.
pub fn fit_johnson(ctx: &FitContext) -> Fit {
    if !ctx.admits(Distribution::Johnson) {
        return Fit::Inapplicable;
    }
    let Some((p, ll)) = johnson_su_mle(ctx) else {
        tracing::debug!("johnson MLE failed");
        return Fit::Inapplicable;
    };

    let su = johnson_fit(JohnsonVariant::Su, p, ll, ctx.n());
    let sb = if sb_range_gate(ctx) {
        johnson_fit(JohnsonVariant::Sb, p, ll, ctx.n())
    } else {
        Fit::Inapplicable
    };
    tracing::debug!(su = su.aicc(), sb = sb.aicc(), "johnson variants");

    select_johnson(su, sb)
}

struct ShashNll<'a> {
    values: &'a [f64],
}

impl ObjectiveFunction for ShashNll<'_> {
    fn eval(&self, p: &[f64]) -> f64 {
        if p[1] <= 0.0 || p[3] <= 0.0 {
            return f64::INFINITY;
        }
        mean_nll(self.values, |x| shash_logpdf(x, p[0], p[1], p[2], p[3]))
    }
}

/// Lower bound on the SHASH `sigma`, in data units.
const SHASH_SIGMA_MIN: f64 = 0.001;

/// `(sigma, nu, tau)` starts in standardized units. The first is the plain
/// (mean, std, 0, 1) start; the wider ones keep `sinh` of the tail points small.
const SHASH_SEEDS: [(f64, f64, f64); 4] = [(1.0, 0.0, 1.0), (3.0, 0.0, 1.0), (3.0, 0.5, 1.0), (3.0, -0.5, 1.0)];

/// SHASH by numeric MLE; only converged runs count, the best of them is kept.
pub fn fit_shash(ctx: &FitContext) -> Fit {
    if !ctx.admits(Distribution::Shash) {
        return Fit::Inapplicable;
    }
    let Some((z, m, sd)) = standardize(ctx) else {
        return Fit::Inapplicable;
    };
    let objective = ShashNll { values: &z };
    let optimizer = ctx.optimizer();
    let bounds = [
        (f64::NEG_INFINITY, f64::INFINITY),
        (SHASH_SIGMA_MIN / sd, f64::INFINITY),
        (-5.0, 5.0),
        (0.001, 5.0),
    ];

    let runs = SHASH_SEEDS.iter().map(|&(sigma, nu, tau)| {
        let result = optimizer.minimize(&objective, &[0.0, sigma, nu, tau], &bounds)?;
        if !result.converged {
            tracing::debug!(status = %result.message, sigma, nu, tau, "SHASH start did not converge");
            return None;
        }
        Some(result)
    });
    let Some(best) = keep_best(runs, |r: &OptimizationResult| r.fval) else {
        return Fit::Inapplicable;
    };

    let q = &best.parameters;
    let (mu, sigma, nu, tau) = (m + sd * q[0], sd * q[1], q[2], q[3]);
    let ll = log_likelihood(ctx.values(), |x| shash_logpdf(x, mu, sigma, nu, tau));
    Fit::from_log_likelihood(DistributionParams::Shash { mu, sigma, nu, tau }, ll, 4, ctx.n())
}

pub fn fit_mixture_2_normals(ctx: &FitContext) -> Fit {
    fit_mixture(ctx, Distribution::Mixture2, 2)
}

pub fn fit_mixture_3_normals(ctx: &FitContext) -> Fit {
    fit_mixture(ctx, Distribution::Mixture3, 3)
}

fn fit_mixture(ctx: &FitContext, distribution: Distribution, components: usize) -> Fit {
    if !ctx.admits(distribution) {
        return Fit::Inapplicable;
    }
    let Some(em) = fit_normal_mixture(ctx.values(), components, &ctx.config.em) else {
        return Fit::Inapplicable;
    };
    if is_degenerate_mixture(&em, ctx.sample.stats().std) {
        tracing::debug!(components, means = ?em.means, weights = ?em.weights, "degenerate mixture rejected");
        return Fit::Inapplicable;
    }

    let params = DistributionParams::NormalMixture(MixtureParams {
        weights: em.weights,
        means: em.means,
        stds: em.stds,
        converged: em.converged,
    });
    Fit::from_log_likelihood(params, em.log_likelihood, distribution.param_count(), ctx.n())
}

/// EM can converge to numerically valid but meaningless mixtures: collapsed
/// widths, merged means or vanished components.
pub fn is_degenerate_mixture(fit: &MixtureFit, global_std: f64) -> bool {
    if fit.stds.iter().any(|&s| !(s > 0.0)) {
        return true;
    }
    let min_gap = global_std / MERGED_MEANS_DIVISOR;
    for i in 0..fit.means.len() {
        for j in (i + 1)..fit.means.len() {
            if (fit.means[i] - fit.means[j]).abs() < min_gap {
                return true;
            }
        }
    }
    fit.weights.iter().any(|&w| w < MIN_COMPONENT_WEIGHT)
}
