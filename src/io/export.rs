//! Report exports.
//!
//! - plain-text report (what the terminal shows)
//! - JSON with every entry's parameters, for downstream scripts

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::fit::selection::FitReport;

/// Write a formatted report to a text file.
pub fn write_report_text(path: &Path, text: &str) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::usage(format!("Failed to create report file '{}': {e}", path.display())))?;
    file.write_all(text.as_bytes())
        .map_err(|e| AppError::usage(format!("Failed to write report file '{}': {e}", path.display())))?;
    tracing::info!(path = %path.display(), "report saved");
    Ok(())
}

#[derive(Debug, Serialize)]
struct RankedJson {
    rank: usize,
    distribution: &'static str,
    aicc: f64,
}

#[derive(Debug, Serialize)]
struct ColumnJson<'a> {
    best: Option<&'static str>,
    ranking: Vec<RankedJson>,
    #[serde(flatten)]
    report: &'a FitReport,
}

#[derive(Debug, Serialize)]
struct ReportFileJson<'a> {
    generated_at: DateTime<Utc>,
    columns: Vec<ColumnJson<'a>>,
}

/// Serialize reports to pretty JSON with a generation timestamp.
pub fn reports_to_json(reports: &[FitReport], generated_at: DateTime<Utc>) -> Result<String, AppError> {
    let columns = reports
        .iter()
        .map(|report| ColumnJson {
            best: report.best().map(|e| e.distribution.display_name()),
            ranking: report
                .ranked()
                .iter()
                .enumerate()
                .map(|(i, e)| RankedJson {
                    rank: i + 1,
                    distribution: e.distribution.display_name(),
                    aicc: e.fit.aicc(),
                })
                .collect(),
            report,
        })
        .collect();

    let file = ReportFileJson { generated_at, columns };
    serde_json::to_string_pretty(&file).map_err(|e| AppError::usage(format!("Failed to serialize report JSON: {e}")))
}

/// Write reports to a JSON file.
pub fn write_report_json(path: &Path, reports: &[FitReport]) -> Result<(), AppError> {
    let json = reports_to_json(reports, Utc::now())?;
    std::fs::write(path, json)
        .map_err(|e| AppError::usage(format!("Failed to write JSON '{}': {e}", path.display())))?;
    tracing::info!(path = %path.display(), columns = reports.len(), "JSON exported");
    Ok(())
}
