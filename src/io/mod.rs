//! Input file helpers.
//!
//! - product catalogue files, one per source kind (`catalog`)
//! - purchase / redeem date file (`catalog`)

pub mod catalog;

pub use catalog::*;
