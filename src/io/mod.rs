//! Input/output helpers.
//!
//! - CSV ingest of numeric columns (`ingest`)
//! - report exports (text/JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
