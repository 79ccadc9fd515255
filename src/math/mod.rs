//! Numeric utilities: descriptive statistics, root finding, bounded minimization.

pub mod optimize;
pub mod roots;
pub mod stats;

pub use optimize::*;
pub use roots::*;
pub use stats::*;
