//! Region statistics and their parallel reduction
//!
//! # Organization
//!
//! This module is organized into submodules:
//! - [`operations`]: Operations, job descriptors and partial results
//! - [`reductions`]: Worker reductions over one sub-region
//! - [`aggregate`]: Combining partials into final statistics
//! - [`metrics`]: The `centroid` and `max_value` entry points

pub mod aggregate;
pub mod metrics;
pub mod operations;
pub mod reductions;

// Re-export the main types and functions for convenience
pub use aggregate::{aggregate_centroid, aggregate_max};
pub use metrics::RegionStats;
pub use operations::{Centroid, CentroidPartial, RegionJob, StatOperation};
pub use reductions::{centroid_partial, max_partial, ReductionFn};
