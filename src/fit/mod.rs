//! Distribution fitting and model selection.
//!
//! Responsibilities:
//!
//! - fit each catalog distribution by maximum likelihood (or EM for mixtures)
//! - score every fit with AICc, including the calibration offsets
//! - rank the applicable fits and pick the best one

pub mod aicc;
pub mod fitter;
pub mod mixture;
pub mod selection;

pub use aicc::*;
pub use fitter::*;
pub use mixture::*;
pub use selection::*;
