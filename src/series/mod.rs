//! Series normalization and derived metrics.
//!
//! - `normalize`: merge raw upstream parts into a sorted, date-unique `Series`
//! - `metrics`: latest / 30-day-prior / point-in-time NAV lookups

pub mod metrics;
pub mod normalize;

pub use metrics::*;
pub use normalize::*;
