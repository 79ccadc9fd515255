//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - the distribution catalog identifiers (`Distribution`)
//! - the validated input sample (`Sample`, `SampleStats`)
//! - fit outputs (`Fit`, `FittedDistribution`, `DistributionParams`)
//! - engine configuration (`EngineConfig`)

pub mod types;

pub use types::*;
