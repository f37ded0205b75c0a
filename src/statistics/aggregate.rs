//! Combining worker partials into final statistics
//!
//! Any failed job, or an engine that reports failure, fails the whole
//! statistic with a single [`RegionStatsError::ReductionFailed`].

use super::operations::{Centroid, CentroidPartial, StatOperation};
use crate::engine::JobResult;
use crate::errors::{RegionStatsError, Result};

/// Return the successful outcomes, or the consolidated error for the first
/// failure in completion order
fn successful<T>(
    operation: StatOperation,
    results: &[JobResult<T>],
    engine_ok: bool,
) -> Result<impl Iterator<Item = &T>> {
    if let Some((job, error)) = results
        .iter()
        .find_map(|r| r.outcome.as_ref().err().map(|e| (r.job, e)))
    {
        return Err(RegionStatsError::ReductionFailed {
            operation: operation.as_str(),
            job: Some(job),
            message: error.to_string(),
        });
    }

    if !engine_ok {
        return Err(RegionStatsError::ReductionFailed {
            operation: operation.as_str(),
            job: None,
            message: "reduction engine reported failure".to_string(),
        });
    }

    Ok(results.iter().filter_map(|r| r.outcome.as_ref().ok()))
}

/// Combine centroid partials, weighting each by its sample count
///
/// When the combined weight is zero or negative the unnormalised means of
/// `weight * x` and `weight * y` are returned. That is `(0.0, 0.0)` for an
/// all-zero field, and the same value for every worker count.
///
/// # Errors
///
/// Returns [`RegionStatsError::ReductionFailed`] if any job failed or
/// `engine_ok` is false.
pub fn aggregate_centroid(
    results: &[JobResult<CentroidPartial>],
    engine_ok: bool,
) -> Result<Centroid> {
    let combined = successful(StatOperation::Centroid, results, engine_ok)?
        .fold(CentroidPartial::default(), |acc, partial| acc.merge(*partial));
    Ok(combined.centroid())
}

/// Maximum of the partial maxima, floored at `0.0`
///
/// # Errors
///
/// Returns [`RegionStatsError::ReductionFailed`] if any job failed or
/// `engine_ok` is false.
pub fn aggregate_max(results: &[JobResult<f64>], engine_ok: bool) -> Result<f64> {
    Ok(successful(StatOperation::MaxValue, results, engine_ok)?.fold(0.0_f64, |acc, &v| acc.max(v)))
}
