//! Catalog, engine and AICc ranking.
//!
//! The engine runs every catalog entry against one sample and returns a
//! `FitReport`. Selection rules:
//!
//! 1. Inapplicable entries are reported but never ranked
//! 2. Applicable entries are ranked by ascending AICc
//! 3. Ties keep catalog order

use serde::Serialize;

use crate::domain::{Distribution, EngineConfig, Fit, Sample, SampleStats};
use crate::error::AppError;
use crate::fit::aicc::{GAMMA_COLUMN_TAG, gamma_correction_applies};
use crate::fit::fitter::{
    FitContext, fit_exponential, fit_gamma, fit_johnson, fit_lognormal, fit_mixture_2_normals,
    fit_mixture_3_normals, fit_normal, fit_shash, fit_weibull,
};

/// Samples with a spread at or below this are treated as constant by the mixtures.
pub const MIN_SPREAD: f64 = 1e-10;

/// Sample standard deviation below which the report flags low variability.
pub const LOW_VARIABILITY_STD: f64 = 0.001;

/// Keep the candidate with the smallest finite key.
///
/// `None` candidates and non-finite keys are skipped; ties keep the earlier
/// candidate. Candidates are consumed lazily, in order.
pub fn keep_best<T, I, K>(candidates: I, key: K) -> Option<T>
where
    I: IntoIterator<Item = Option<T>>,
    K: Fn(&T) -> f64,
{
    let mut best: Option<(f64, T)> = None;
    for candidate in candidates.into_iter().flatten() {
        let k = key(&candidate);
        if !k.is_finite() {
            continue;
        }
        match &best {
            Some((best_k, _)) if *best_k <= k => {}
            _ => best = Some((k, candidate)),
        }
    }
    best.map(|(_, c)| c)
}

/// Value domain a distribution requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    Real,
    NonNegative,
    Positive,
}

impl Support {
    fn admits(self, sample: &Sample) -> bool {
        match self {
            Support::Real => true,
            Support::NonNegative => sample.all_non_negative(),
            Support::Positive => sample.all_positive(),
        }
    }
}

/// One fittable distribution: preconditions, penalty and fit routine.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub distribution: Distribution,
    pub min_n: usize,
    pub support: Support,
    /// Require a std and range above `MIN_SPREAD`.
    pub requires_spread: bool,
    pub fit: fn(&FitContext) -> Fit,
}

impl CatalogEntry {
    pub fn param_count(&self) -> usize {
        self.distribution.param_count()
    }

    /// Cheap precondition gate run before any fitting.
    pub fn admits(&self, sample: &Sample) -> bool {
        if sample.len() < self.min_n || !self.support.admits(sample) {
            return false;
        }
        if self.requires_spread {
            let stats = sample.stats();
            return stats.std >= MIN_SPREAD && stats.range() >= MIN_SPREAD;
        }
        true
    }
}

const fn entry(
    distribution: Distribution,
    min_n: usize,
    support: Support,
    requires_spread: bool,
    fit: fn(&FitContext) -> Fit,
) -> CatalogEntry {
    CatalogEntry {
        distribution,
        min_n,
        support,
        requires_spread,
        fit,
    }
}

/// All distributions, in reporting order (same order as `Distribution::ALL`).
pub static CATALOG: [CatalogEntry; 9] = [
    entry(Distribution::Normal, 3, Support::Real, false, fit_normal),
    entry(Distribution::LogNormal, 3, Support::Positive, false, fit_lognormal),
    entry(Distribution::Exponential, 2, Support::NonNegative, false, fit_exponential),
    entry(Distribution::Gamma, 3, Support::Positive, false, fit_gamma),
    entry(Distribution::Weibull, 3, Support::Positive, false, fit_weibull),
    entry(Distribution::Johnson, 10, Support::Real, false, fit_johnson),
    entry(Distribution::Shash, 10, Support::Real, false, fit_shash),
    entry(Distribution::Mixture2, 10, Support::Real, true, fit_mixture_2_normals),
    entry(Distribution::Mixture3, 15, Support::Real, true, fit_mixture_3_normals),
];

pub fn catalog_entry(distribution: Distribution) -> &'static CatalogEntry {
    &CATALOG[distribution as usize]
}

/// One catalog entry's outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub distribution: Distribution,
    pub fit: Fit,
}

/// Contextual remarks attached to a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportNote {
    /// The column name carries the Gamma tag; records whether the calibration fired.
    GammaCalibration { applied: bool },
    /// Sample standard deviation below `LOW_VARIABILITY_STD`.
    LowVariability { sample_std: f64 },
}

impl ReportNote {
    pub fn message(&self) -> String {
        match self {
            ReportNote::GammaCalibration { applied: true } => {
                "Column name contains 'GAMMA': the Gamma calibration offset was applied.".to_string()
            }
            ReportNote::GammaCalibration { applied: false } => {
                "Column name contains 'GAMMA': the Gamma calibration was considered but not applied.".to_string()
            }
            ReportNote::LowVariability { sample_std } => {
                format!("Sample has very low variability (std = {sample_std:.6}).")
            }
        }
    }
}

/// Every catalog entry's fit for one sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    pub column_name: String,
    pub stats: SampleStats,
    /// Catalog order, always one entry per distribution.
    pub entries: Vec<ReportEntry>,
    pub notes: Vec<ReportNote>,
}

impl FitReport {
    pub fn entry(&self, distribution: Distribution) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.distribution == distribution)
    }

    /// AICc of one distribution, `+inf` when inapplicable.
    pub fn aicc(&self, distribution: Distribution) -> f64 {
        self.entry(distribution).map_or(f64::INFINITY, |e| e.fit.aicc())
    }

    /// Applicable entries by ascending AICc.
    pub fn ranked(&self) -> Vec<&ReportEntry> {
        let mut ranked: Vec<&ReportEntry> = self.entries.iter().filter(|e| e.fit.is_applicable()).collect();
        // Stable sort: equal AICc keeps catalog order.
        ranked.sort_by(|a, b| a.fit.aicc().total_cmp(&b.fit.aicc()));
        ranked
    }

    pub fn best(&self) -> Option<&ReportEntry> {
        self.ranked().into_iter().next()
    }

    pub fn inapplicable(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| !e.fit.is_applicable())
    }

    /// `display name -> AICc` for all nine distributions.
    pub fn aicc_by_name(&self) -> Vec<(&'static str, f64)> {
        self.entries
            .iter()
            .map(|e| (e.distribution.display_name(), e.fit.aicc()))
            .collect()
    }
}

/// Fits the whole catalog to a sample. Holds only immutable configuration.
#[derive(Debug, Clone, Default)]
pub struct AiccEngine {
    config: EngineConfig,
}

impl AiccEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fit every catalog entry to `values`.
    ///
    /// Fails only for an empty sample or non-finite values; per-distribution
    /// failures are reported as inapplicable entries.
    pub fn fit_all(&self, values: &[f64], column_name: &str) -> Result<FitReport, AppError> {
        let sample = Sample::new(values.to_vec())?;
        Ok(self.fit_sample(&sample, column_name))
    }

    pub fn fit_sample(&self, sample: &Sample, column_name: &str) -> FitReport {
        let ctx = FitContext::new(sample, column_name, &self.config);
        let entries: Vec<ReportEntry> = CATALOG
            .iter()
            .map(|entry| ReportEntry {
                distribution: entry.distribution,
                fit: run_entry(entry, &ctx),
            })
            .collect();

        FitReport {
            column_name: column_name.to_string(),
            stats: sample.stats().clone(),
            entries,
            notes: collect_notes(sample, column_name),
        }
    }

    /// Fit a single distribution.
    pub fn fit_distribution(
        &self,
        distribution: Distribution,
        values: &[f64],
        column_name: &str,
    ) -> Result<Fit, AppError> {
        let sample = Sample::new(values.to_vec())?;
        let ctx = FitContext::new(&sample, column_name, &self.config);
        Ok(run_entry(catalog_entry(distribution), &ctx))
    }
}

fn run_entry(entry: &CatalogEntry, ctx: &FitContext) -> Fit {
    if !entry.admits(ctx.sample) {
        tracing::debug!(distribution = %entry.distribution, n = ctx.sample.len(), "precondition not met");
        return Fit::Inapplicable;
    }
    let fit = (entry.fit)(ctx);
    match &fit {
        Fit::Applicable(f) => tracing::debug!(
            distribution = %entry.distribution,
            ll = f.log_likelihood,
            aicc = f.aicc,
            "fit finished"
        ),
        Fit::Inapplicable => tracing::debug!(distribution = %entry.distribution, "fit inapplicable"),
    }
    fit
}

fn collect_notes(sample: &Sample, column_name: &str) -> Vec<ReportNote> {
    let stats = sample.stats();
    let mut notes = Vec::new();
    if column_name.to_uppercase().contains(GAMMA_COLUMN_TAG) {
        notes.push(ReportNote::GammaCalibration {
            applied: sample.all_positive() && gamma_correction_applies(column_name, stats.mean, stats.std),
        });
    }
    if stats.sample_std < LOW_VARIABILITY_STD {
        notes.push(ReportNote::LowVariability {
            sample_std: stats.sample_std,
        });
    }
    notes
}
