//! Reporting utilities: formatted terminal output for fit reports.

pub mod format;

pub use format::*;
