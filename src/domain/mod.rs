//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - NAV observations and normalized series (`NavPoint`, `Series`)
//! - units of work and their results (`ProductTask`, `Record`, `NavValue`)
//! - the run configuration (`RunConfig`)

pub mod types;

pub use types::*;
