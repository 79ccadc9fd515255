//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - installs the log subscriber
//! - loads CSV columns or generates a demo sample
//! - runs the engine and prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Cli, ColumnsArgs, Command, DemoArgs, DemoShape, EngineArgs, FitArgs, OutputArgs};
use crate::data::SampleShape;
use crate::domain::{EmConfig, EngineConfig, OptimizerConfig};
use crate::error::AppError;
use crate::fit::selection::AiccEngine;

pub mod pipeline;

use pipeline::{ColumnRun, ColumnSelection};

/// Entry point for the `aicc` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match cli.command {
        Command::Columns(args) => handle_columns(args),
        Command::Fit(args) => handle_fit(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn init_logging(level: tracing::Level) {
    // Reports go to stdout; diagnostics stay on stderr.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_columns(args: ColumnsArgs) -> Result<(), AppError> {
    let table = crate::io::ingest::load_numeric_table(&args.csv)?;
    print!("{}", crate::report::format_columns(&table));
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let engine = AiccEngine::new(engine_config_from_args(&args.engine)?);
    let table = crate::io::ingest::load_numeric_table(&args.csv)?;
    let selection = if args.all {
        ColumnSelection::All
    } else {
        ColumnSelection::Named(args.columns.clone())
    };

    let runs = pipeline::run_columns(&engine, &table, &selection)?;
    emit(&runs, &args.output)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let engine = AiccEngine::new(engine_config_from_args(&args.engine)?);
    let shape = demo_shape(args.dist);
    println!("Demo sample: {} (n={}, seed={})\n", shape.describe(), args.n, args.seed);

    let run = pipeline::run_demo(&engine, &shape, args.n, args.seed, &args.name)?;
    emit(std::slice::from_ref(&run), &args.output)
}

/// Print every report (and plot), then write the optional exports.
fn emit(runs: &[ColumnRun], output: &OutputArgs) -> Result<(), AppError> {
    let mut saved = String::new();
    for run in runs {
        let text = crate::report::format_report(&run.report);
        println!("{text}");

        if output.plot {
            let best = run
                .report
                .best()
                .and_then(|e| e.fit.params().map(|p| (e.distribution.display_name(), p)));
            let plot = crate::plot::render_fit_plot(&run.values, best, output.width, output.height);
            println!("{plot}");
        }

        saved.push_str(&text);
        saved.push('\n');
    }

    if let Some(path) = &output.save {
        crate::io::export::write_report_text(path, &saved)?;
    }
    if let Some(path) = &output.export_json {
        let reports: Vec<_> = runs.iter().map(|r| r.report.clone()).collect();
        crate::io::export::write_report_json(path, &reports)?;
    }

    Ok(())
}

pub fn engine_config_from_args(args: &EngineArgs) -> Result<EngineConfig, AppError> {
    if args.em_max_iter == 0 || args.opt_max_iter == 0 {
        return Err(AppError::usage("Iteration caps must be > 0."));
    }
    if !(args.em_tol.is_finite() && args.em_tol > 0.0) {
        return Err(AppError::usage("--em-tol must be a positive number."));
    }

    Ok(EngineConfig {
        em: EmConfig {
            max_iter: args.em_max_iter,
            tol: args.em_tol,
        },
        optimizer: OptimizerConfig {
            max_iter: args.opt_max_iter,
            ..OptimizerConfig::default()
        },
    })
}

fn demo_shape(dist: DemoShape) -> SampleShape {
    match dist {
        DemoShape::Normal => SampleShape::Normal { mean: 10.0, std: 2.0 },
        DemoShape::Lognormal => SampleShape::LogNormal { mu: 1.0, sigma: 0.5 },
        DemoShape::Exponential => SampleShape::Exponential { scale: 2.0 },
        DemoShape::Gamma => SampleShape::Gamma { shape: 2.0, scale: 1.5 },
        DemoShape::Weibull => SampleShape::Weibull { shape: 1.5, scale: 3.0 },
        DemoShape::Bimodal => SampleShape::NormalMixture {
            components: vec![(0.5, 0.0, 1.0), (0.5, 6.0, 1.0)],
        },
    }
}
