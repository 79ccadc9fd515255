//! `aicc-bestfit` library crate.
//!
//! The binary (`aicc`) is a thin wrapper around this library so that:
//!
//! - the fitting engine is testable without spawning processes
//! - modules are reusable from other hosts
//! - code stays easy to navigate as the project grows
//!
//! The engine entry point is [`fit::AiccEngine`].

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
