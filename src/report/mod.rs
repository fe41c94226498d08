//! Terminal reporting for a sync run.

pub mod format;

pub use format::*;
