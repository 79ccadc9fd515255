//! Command-line parsing for the best-fit distribution tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "aicc", version, about = "Best-fit distribution selection by AICc")]
pub struct Cli {
    /// Log level for diagnostics written to stderr (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the numeric columns of a CSV file.
    Columns(ColumnsArgs),
    /// Fit all distributions to one or more CSV columns and rank them by AICc.
    Fit(FitArgs),
    /// Generate a reproducible synthetic sample and analyse it.
    Demo(DemoArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ColumnsArgs {
    /// Input CSV (header row required).
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Input CSV (header row required).
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,

    /// Column to analyse; repeat for several columns.
    #[arg(short = 'c', long = "column", value_name = "NAME", required_unless_present = "all")]
    pub columns: Vec<String>,

    /// Analyse every numeric column.
    #[arg(long, conflicts_with = "columns")]
    pub all: bool,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Shapes available to `aicc demo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoShape {
    Normal,
    Lognormal,
    Exponential,
    Gamma,
    Weibull,
    /// Two well separated normal components.
    Bimodal,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Shape of the synthetic sample.
    #[arg(long, value_enum, default_value_t = DemoShape::Normal)]
    pub dist: DemoShape,

    /// Sample size.
    #[arg(short = 'n', long, default_value_t = 200)]
    pub n: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Column name used for the report (the Gamma calibration reads it).
    #[arg(long, default_value = "demo")]
    pub name: String,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Engine iteration caps and tolerances.
#[derive(Debug, Args, Clone)]
pub struct EngineArgs {
    /// Maximum EM iterations per mixture restart.
    #[arg(long, default_value_t = 100)]
    pub em_max_iter: usize,

    /// EM convergence tolerance on the log-likelihood change.
    #[arg(long, default_value_t = 1e-6)]
    pub em_tol: f64,

    /// Maximum iterations of the numeric likelihood optimizer.
    #[arg(long, default_value_t = 1000)]
    pub opt_max_iter: u64,
}

/// Report outputs shared by `fit` and `demo`.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Save the text report to a file.
    #[arg(long, value_name = "TXT")]
    pub save: Option<PathBuf>,

    /// Export the full report (parameters, ranking, notes) to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Render an ASCII histogram with the best density.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}
