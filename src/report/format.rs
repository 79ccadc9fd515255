//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{DistributionParams, Fit, JohnsonVariant};
use crate::fit::selection::FitReport;
use crate::io::ingest::NumericTable;

/// Shown in place of a best distribution when no entry is applicable.
pub const NO_FIT_MESSAGE: &str = "Could not fit any distribution to this sample.";

/// Format the full report for one column: statistics, ranking, best fit, notes.
pub fn format_report(report: &FitReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== aicc - Best-fit distribution: {} ===\n", report.column_name));
    out.push_str(&format_stats(report));

    out.push_str("\nAICc ranking (lower is better):\n");
    out.push_str(&format_ranking(report));

    let inapplicable: Vec<&str> = report.inapplicable().map(|e| e.distribution.display_name()).collect();
    if !inapplicable.is_empty() {
        out.push_str(&format!("\nNot applicable: {}\n", inapplicable.join(", ")));
    }

    match report.best() {
        Some(best) => {
            out.push_str(&format!("\nBest distribution: {}\n", best.distribution));
            out.push_str(&format!("Best AICc: {:.3}\n", best.fit.aicc()));
            if let Some(params) = best.fit.params() {
                out.push_str(&format!("Parameters: {}\n", format_params(params)));
            }
        }
        None => {
            out.push('\n');
            out.push_str(NO_FIT_MESSAGE);
            out.push('\n');
        }
    }

    if !report.notes.is_empty() {
        out.push_str("\nNotes:\n");
        for note in &report.notes {
            out.push_str(&format!("- {}\n", note.message()));
        }
    }

    out
}

fn format_stats(report: &FitReport) -> String {
    let s = &report.stats;
    let mut out = String::new();
    out.push_str(&format!("Points: n={}\n", s.n));
    out.push_str(&format!("Mean: {:.6}\n", s.mean));
    out.push_str(&format!("Std (sample): {:.6}\n", s.sample_std));
    out.push_str(&format!("Range: [{:.6}, {:.6}]\n", s.min, s.max));
    out
}

fn format_ranking(report: &FitReport) -> String {
    let mut out = String::new();
    out.push_str(format!("{:>4} {:<22} {:>12} {:>14}\n", "rank", "distribution", "AICc", "log-lik").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<4} {:-<22} {:-<12} {:-<14}\n", "", "", "", "").trim_end());
    out.push('\n');

    for (i, entry) in report.ranked().iter().enumerate() {
        let Fit::Applicable(f) = &entry.fit else {
            continue;
        };
        out.push_str(
            format!(
                "{:>4} {:<22} {:>12.3} {:>14.3}\n",
                format!("{}.", i + 1),
                entry.distribution.display_name(),
                f.aicc,
                f.log_likelihood,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// One-line parameter summary.
pub fn format_params(params: &DistributionParams) -> String {
    match params {
        DistributionParams::Normal { mu, sigma } => format!("mu={mu:.6}, sigma={sigma:.6}"),
        DistributionParams::LogNormal { s, scale } => format!("s={s:.6}, scale={scale:.6}"),
        DistributionParams::Exponential { scale } => format!("scale={scale:.6}"),
        DistributionParams::Gamma { shape, scale, method } => {
            format!("shape={shape:.6}, scale={scale:.6} ({})", method.label())
        }
        DistributionParams::Weibull { shape, scale } => format!("shape={shape:.6}, scale={scale:.6}"),
        DistributionParams::Johnson {
            variant,
            gamma,
            delta,
            loc,
            scale,
        } => {
            let v = match variant {
                JohnsonVariant::Su => "Su",
                JohnsonVariant::Sb => "Sb",
            };
            format!("[{v}] gamma={gamma:.6}, delta={delta:.6}, loc={loc:.6}, scale={scale:.6}")
        }
        DistributionParams::Shash { mu, sigma, nu, tau } => {
            format!("mu={mu:.6}, sigma={sigma:.6}, nu={nu:.6}, tau={tau:.6}")
        }
        DistributionParams::NormalMixture(m) => {
            let mut parts = Vec::with_capacity(m.components());
            for j in 0..m.components() {
                parts.push(format!("{:.3}*N({:.6}, {:.6})", m.weights[j], m.means[j], m.stds[j]));
            }
            let suffix = if m.converged { "" } else { " (EM iteration cap reached)" };
            format!("{}{suffix}", parts.join(" + "))
        }
    }
}

/// Numeric columns of a table with their usable counts.
pub fn format_columns(table: &NumericTable) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<32} {:>8} {:>8}\n", "column", "values", "missing").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<32} {:-<8} {:-<8}\n", "", "", "").trim_end());
    out.push('\n');
    for c in &table.columns {
        out.push_str(format!("{:<32} {:>8} {:>8}\n", truncate(&c.name, 32), c.values.len(), c.missing).trim_end());
        out.push('\n');
    }
    if !table.skipped.is_empty() {
        out.push_str(&format!("\nNon-numeric columns skipped: {}\n", table.skipped.join(", ")));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Distribution, FittedDistribution, MixtureParams, Sample};
    use crate::fit::selection::{ReportEntry, ReportNote};
    use crate::io::ingest::ColumnData;

    fn report(fits: Vec<Fit>, notes: Vec<ReportNote>) -> FitReport {
        let sample = Sample::new(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        FitReport {
            column_name: "Thickness".to_string(),
            stats: sample.stats().clone(),
            entries: Distribution::ALL
                .iter()
                .zip(fits)
                .map(|(&distribution, fit)| ReportEntry { distribution, fit })
                .collect(),
            notes,
        }
    }

    fn applicable(params: DistributionParams, aicc: f64) -> Fit {
        Fit::Applicable(FittedDistribution {
            params,
            log_likelihood: -aicc / 2.0,
            aicc,
        })
    }

    #[test]
    fn report_lists_best_and_ranking() {
        let mut fits = vec![Fit::Inapplicable; 9];
        fits[0] = applicable(DistributionParams::Normal { mu: 2.5, sigma: 1.1 }, 14.0);
        fits[2] = applicable(DistributionParams::Exponential { scale: 2.5 }, 12.5);
        let text = format_report(&report(fits, vec![]));

        assert!(text.contains("Best distribution: Exponential"));
        assert!(text.contains("Best AICc: 12.500"));
        let expo = text.find("2. Normal").unwrap();
        assert!(text.find("1. Exponential").unwrap() < expo);
        assert!(text.contains("Not applicable: LogNormal, Gamma"));
        assert!(!text.contains(NO_FIT_MESSAGE));
    }

    #[test]
    fn report_without_fits() {
        let text = format_report(&report(
            vec![Fit::Inapplicable; 9],
            vec![ReportNote::LowVariability { sample_std: 0.0 }],
        ));
        assert!(text.contains(NO_FIT_MESSAGE));
        assert!(text.contains("very low variability"));
        assert!(!text.contains("Best distribution"));
    }

    #[test]
    fn mixture_params_mention_cap() {
        let params = DistributionParams::NormalMixture(MixtureParams {
            weights: vec![0.4, 0.6],
            means: vec![0.0, 5.0],
            stds: vec![1.0, 1.0],
            converged: false,
        });
        let s = format_params(&params);
        assert!(s.starts_with("0.400*N(0.000000, 1.000000) + 0.600*N(5.000000"));
        assert!(s.ends_with("(EM iteration cap reached)"));
    }

    #[test]
    fn columns_table() {
        let table = NumericTable {
            columns: vec![ColumnData {
                name: "GAMMA".to_string(),
                values: vec![2.2, 2.21],
                missing: 1,
            }],
            skipped: vec!["Lot".to_string()],
        };
        let text = format_columns(&table);
        assert!(text.contains("GAMMA"));
        assert!(text.contains("Non-numeric columns skipped: Lot"));
    }

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
