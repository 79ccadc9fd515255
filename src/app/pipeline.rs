//! Shared analysis pipeline used by the `fit` and `demo` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! column selection -> size check -> engine fit -> report
//!
//! Columns are independent, so several are analysed in parallel.

use rayon::prelude::*;

use crate::data::{SampleShape, generate_sample};
use crate::error::AppError;
use crate::fit::selection::{AiccEngine, FitReport};
use crate::io::ingest::{ColumnData, NumericTable};

/// Samples smaller than this are rejected before fitting.
pub const MIN_ANALYSIS_POINTS: usize = 3;

/// Which columns of a table to analyse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelection {
    Named(Vec<String>),
    All,
}

/// Outputs of one analysed column.
#[derive(Debug, Clone)]
pub struct ColumnRun {
    pub report: FitReport,
    /// The values that were fitted, kept for plotting.
    pub values: Vec<f64>,
}

/// Analyse one column.
pub fn analyse_values(engine: &AiccEngine, name: &str, values: &[f64]) -> Result<ColumnRun, AppError> {
    if values.len() < MIN_ANALYSIS_POINTS {
        return Err(AppError::data(format!(
            "Column '{name}' has {} value(s); at least {MIN_ANALYSIS_POINTS} are needed.",
            values.len()
        )));
    }

    let report = engine.fit_all(values, name)?;
    tracing::info!(
        column = name,
        n = values.len(),
        best = report.best().map(|e| e.distribution.display_name()),
        "column analysed"
    );
    Ok(ColumnRun {
        report,
        values: values.to_vec(),
    })
}

/// Resolve the selection against the table, in request order (or table order for `All`).
pub fn select_columns<'a>(table: &'a NumericTable, selection: &ColumnSelection) -> Result<Vec<&'a ColumnData>, AppError> {
    match selection {
        ColumnSelection::Named(names) => names.iter().map(|n| table.column(n)).collect(),
        ColumnSelection::All => {
            let mut out = Vec::new();
            for column in &table.columns {
                if column.values.len() < MIN_ANALYSIS_POINTS {
                    tracing::warn!(column = %column.name, n = column.values.len(), "too few values; column skipped");
                    continue;
                }
                out.push(column);
            }
            if out.is_empty() {
                return Err(AppError::data("No numeric column has enough values to analyse."));
            }
            Ok(out)
        }
    }
}

/// Analyse the selected columns in parallel; results keep selection order.
pub fn run_columns(
    engine: &AiccEngine,
    table: &NumericTable,
    selection: &ColumnSelection,
) -> Result<Vec<ColumnRun>, AppError> {
    let columns = select_columns(table, selection)?;
    columns
        .par_iter()
        .map(|c| analyse_values(engine, &c.name, &c.values))
        .collect()
}

/// Generate a synthetic sample and analyse it.
pub fn run_demo(engine: &AiccEngine, shape: &SampleShape, n: usize, seed: u64, name: &str) -> Result<ColumnRun, AppError> {
    let values = generate_sample(shape, n, seed)?;
    tracing::info!(shape = %shape.describe(), n, seed, "demo sample generated");
    analyse_values(engine, name, &values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXIT_DATA;
    use crate::io::ingest::read_numeric_table;

    #[test]
    fn rejects_tiny_samples() {
        let err = analyse_values(&AiccEngine::default(), "x", &[1.0, 2.0]).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_DATA);
    }

    #[test]
    fn all_skips_short_columns_and_keeps_order() {
        let csv = "a,b,c\n1,5,9\n2,,8\n3,,7\n4,,6\n";
        let table = read_numeric_table(csv.as_bytes()).unwrap();
        let picked = select_columns(&table, &ColumnSelection::All).unwrap();
        let names: Vec<&str> = picked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn named_selection_reports_unknown_columns() {
        let csv = "a\n1\n2\n3\n";
        let table = read_numeric_table(csv.as_bytes()).unwrap();
        let err = select_columns(&table, &ColumnSelection::Named(vec!["zz".to_string()])).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_DATA);
    }

    #[test]
    fn parallel_runs_match_sequential() {
        let csv = "a,b\n1.0,10.2\n2.5,11.1\n2.0,9.7\n3.1,10.4\n4.2,10.9\n";
        let table = read_numeric_table(csv.as_bytes()).unwrap();
        let engine = AiccEngine::default();
        let runs = run_columns(&engine, &table, &ColumnSelection::All).unwrap();
        assert_eq!(runs.len(), 2);
        for (run, column) in runs.iter().zip(&table.columns) {
            let sequential = engine.fit_all(&column.values, &column.name).unwrap();
            assert_eq!(run.report, sequential);
        }
    }

    #[test]
    fn demo_is_reproducible() {
        let engine = AiccEngine::default();
        let shape = SampleShape::Exponential { scale: 2.0 };
        let a = run_demo(&engine, &shape, 60, 3, "demo").unwrap();
        let b = run_demo(&engine, &shape, 60, 3, "demo").unwrap();
        assert_eq!(a.values, b.values);
        assert_eq!(a.report, b.report);
    }
}
