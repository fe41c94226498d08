//! Task planning and execution.
//!
//! - `planner`: catalogue + purchase events -> ordered task list
//! - `executor`: bounded parallel execution, one record per task

pub mod executor;
pub mod planner;

pub use executor::*;
pub use planner::*;
