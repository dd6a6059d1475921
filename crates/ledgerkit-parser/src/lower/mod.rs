//! Tree lowering passes.
//!
//! - [`cst_to_raw`]: CST → raw model, total except for a commodity amount
//!   without commodity text.
//! - [`raw_to_cooked`]: raw model → cooked model, resolving dates and tags and
//!   cross-checking commodity directives.

pub mod cst_to_raw;
pub mod raw_to_cooked;
