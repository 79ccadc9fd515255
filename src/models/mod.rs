//! Distribution family implementations.
//!
//! Families are implemented as small, pure log-density functions so that
//! fitting and plotting code can stay generic.

pub mod density;

pub use density::*;
