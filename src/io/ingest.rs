//! CSV ingest.
//!
//! Turns a CSV with a header row into the set of its numeric columns, each with
//! its missing values dropped.
//!
//! Rules:
//! - a column is numeric when every non-missing cell parses as a finite `f64`
//!   and at least one cell does
//! - empty, `NA`, `NaN`, `null` (any case) cells are missing values
//! - a UTF-8 BOM on the first header is stripped
//! - short rows are padded with missing values

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::AppError;

/// One numeric column with missing values removed.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnData {
    pub name: String,
    /// Non-missing values in row order.
    pub values: Vec<f64>,
    /// Number of missing cells that were dropped.
    pub missing: usize,
}

/// Numeric columns of a CSV, in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericTable {
    pub columns: Vec<ColumnData>,
    /// Names of columns that were not numeric.
    pub skipped: Vec<String>,
}

impl NumericTable {
    /// Look up a numeric column by exact name.
    pub fn column(&self, name: &str) -> Result<&ColumnData, AppError> {
        if let Some(c) = self.columns.iter().find(|c| c.name == name) {
            return Ok(c);
        }
        if self.skipped.iter().any(|s| s == name) {
            return Err(AppError::data(format!("Column '{name}' is not numeric.")));
        }
        let available: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        Err(AppError::data(format!(
            "Column '{name}' not found. Numeric columns: {}",
            available.join(", ")
        )))
    }
}

/// Load the numeric columns of a CSV file.
pub fn load_numeric_table(path: &Path) -> Result<NumericTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::usage(format!("Failed to open CSV '{}': {e}", path.display())))?;
    let table = read_numeric_table(file)?;
    tracing::info!(
        path = %path.display(),
        numeric = table.columns.len(),
        skipped = table.skipped.len(),
        "CSV loaded"
    );
    Ok(table)
}

/// Parse CSV content from any reader.
pub fn read_numeric_table<R: Read>(reader: R) -> Result<NumericTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::usage(format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();
    if headers.is_empty() {
        return Err(AppError::usage("CSV has no header row."));
    }

    let mut cells: Vec<Vec<Option<f64>>> = vec![Vec::new(); headers.len()];
    let mut numeric = vec![true; headers.len()];

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::usage(format!("CSV parse error at line {line}: {e}")))?;

        for (col, column_cells) in cells.iter_mut().enumerate() {
            let raw = record.get(col).unwrap_or("");
            if is_missing(raw) {
                column_cells.push(None);
                continue;
            }
            match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => column_cells.push(Some(v)),
                _ => {
                    if numeric[col] {
                        tracing::debug!(column = %headers[col], line, value = raw, "non-numeric cell");
                    }
                    numeric[col] = false;
                    column_cells.push(None);
                }
            }
        }
    }

    let mut columns = Vec::new();
    let mut skipped = Vec::new();
    for ((name, column_cells), is_numeric) in headers.into_iter().zip(cells).zip(numeric) {
        let values: Vec<f64> = column_cells.iter().flatten().copied().collect();
        if !is_numeric || values.is_empty() {
            skipped.push(name);
            continue;
        }
        let missing = column_cells.len() - values.len();
        columns.push(ColumnData { name, values, missing });
    }

    Ok(NumericTable { columns, skipped })
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn is_missing(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty()
        || raw.eq_ignore_ascii_case("na")
        || raw.eq_ignore_ascii_case("nan")
        || raw.eq_ignore_ascii_case("null")
}
