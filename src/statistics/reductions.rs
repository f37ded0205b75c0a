//! Worker-side reductions over one sub-region
//!
//! Both functions resolve the node by name themselves, walk the region at the
//! job's step and stop at the first sampling error.

use super::operations::{CentroidPartial, RegionJob};
use crate::data_source::{ImageNode, NodeResolver};
use crate::errors::Result;

/// Signature shared by the worker reductions
pub type ReductionFn<R, T> = fn(&R, &RegionJob) -> Result<T>;

/// Weighted running means of the job's region
///
/// # Errors
///
/// Fails if the node cannot be resolved or any sample cannot be read.
pub fn centroid_partial<R: NodeResolver>(resolver: &R, job: &RegionJob) -> Result<CentroidPartial> {
    let node = resolver.resolve(&job.node_name)?;
    let mut partial = CentroidPartial::default();

    for (x, y) in job.region.sample_points(job.step) {
        let weight = f64::from(node.sample(&job.channel, x, y)?);
        partial.push(f64::from(x), f64::from(y), weight);
    }

    Ok(partial)
}

/// Largest sample of the job's region
///
/// The maximum starts at `0.0`, so a region whose samples are all negative
/// reports `0.0`.
///
/// # Errors
///
/// Fails if the node cannot be resolved or any sample cannot be read.
pub fn max_partial<R: NodeResolver>(resolver: &R, job: &RegionJob) -> Result<f64> {
    let node = resolver.resolve(&job.node_name)?;
    let mut max_val = 0.0_f64;

    for (x, y) in job.region.sample_points(job.step) {
        max_val = max_val.max(f64::from(node.sample(&job.channel, x, y)?));
    }

    Ok(max_val)
}
