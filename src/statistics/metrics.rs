//! Public entry points: centroid and maximum value of a node channel
//!
//! Each call converts the node's bounding box to a region, splits it into one
//! sub-region per worker, runs the worker reductions on a scoped pool while
//! driving the host's progress task, and aggregates the partials.
//!
//! A call ends in one of three ways: `Ok(Some(_))` when every job completed,
//! `Ok(None)` when the task was cancelled, or `Err(_)` carrying the first job
//! error.

use super::aggregate::{aggregate_centroid, aggregate_max};
use super::operations::{Centroid, CentroidPartial, RegionJob, StatOperation};
use super::reductions::{centroid_partial, max_partial, ReductionFn};
use crate::bounds::Bounds;
use crate::data_source::{ImageNode, NodeResolver};
use crate::engine::{self, JobResult};
use crate::errors::{RegionStatsError, Result};
use crate::parallel::ParallelConfig;
use crate::progress::{drive, DriveStatus, ProgressTask};
use log::{debug, info};
use std::sync::Arc;

type AggregateFn<T, A> = fn(&[JobResult<T>], bool) -> Result<A>;

/// Region statistics over the nodes of one resolver
#[derive(Debug)]
pub struct RegionStats<R> {
    resolver: Arc<R>,
    config: ParallelConfig,
}

impl<R> Clone for RegionStats<R> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            config: self.config.clone(),
        }
    }
}

impl<R: NodeResolver + 'static> RegionStats<R> {
    /// Use one worker per logical CPU
    pub fn new(resolver: R) -> Self {
        Self::from_shared(Arc::new(resolver))
    }

    pub fn from_shared(resolver: Arc<R>) -> Self {
        Self {
            resolver,
            config: ParallelConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ParallelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<R> {
        &self.resolver
    }

    /// Value-weighted centroid of `channel` over the node's bounding box
    ///
    /// `step` samples every `step`-th row and column, trading accuracy for a
    /// `step²` speedup. If the sampled weights sum to zero the result is
    /// `(0.0, 0.0)`.
    ///
    /// # Errors
    ///
    /// Returns [`RegionStatsError::InvalidStep`] for `step == 0`, an error for
    /// an empty bounding box, and [`RegionStatsError::ReductionFailed`] if any
    /// worker fails.
    pub fn centroid<N>(
        &self,
        node: &N,
        channel: &str,
        step: usize,
        task: &mut dyn ProgressTask,
    ) -> Result<Option<Centroid>>
    where
        N: ImageNode + ?Sized,
    {
        self.run::<N, CentroidPartial, Centroid>(
            StatOperation::Centroid,
            node,
            channel,
            step,
            task,
            centroid_partial::<R>,
            aggregate_centroid,
        )
    }

    /// Maximum of `channel` over the node's bounding box
    ///
    /// The maximum is floored at `0.0`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::centroid`].
    pub fn max_value<N>(
        &self,
        node: &N,
        channel: &str,
        step: usize,
        task: &mut dyn ProgressTask,
    ) -> Result<Option<f64>>
    where
        N: ImageNode + ?Sized,
    {
        self.run::<N, f64, f64>(
            StatOperation::MaxValue,
            node,
            channel,
            step,
            task,
            max_partial::<R>,
            aggregate_max,
        )
    }

    /// Jobs a reduction of `node` would dispatch
    ///
    /// # Errors
    ///
    /// Fails for `step == 0` or an invalid bounding box.
    pub fn plan<N>(&self, node: &N, channel: &str, step: usize) -> Result<Vec<RegionJob>>
    where
        N: ImageNode + ?Sized,
    {
        if step == 0 {
            return Err(RegionStatsError::InvalidStep(step));
        }

        let region = Bounds::from_bbox(node.bbox()?)?;
        Ok(region
            .partition_aligned(self.config.worker_count(), step)
            .into_iter()
            .map(|sub| RegionJob::new(sub, node.name(), channel, step))
            .collect())
    }

    #[allow(clippy::too_many_arguments)]
    fn run<N, T, A>(
        &self,
        operation: StatOperation,
        node: &N,
        channel: &str,
        step: usize,
        task: &mut dyn ProgressTask,
        reduce: ReductionFn<R, T>,
        aggregate: AggregateFn<T, A>,
    ) -> Result<Option<A>>
    where
        N: ImageNode + ?Sized,
        T: Send + 'static,
    {
        let jobs = self.plan(node, channel, step)?;
        info!(
            "Computing {} of '{}' channel '{}' in {} jobs (step {})",
            operation,
            node.name(),
            channel,
            jobs.len(),
            step
        );
        for job in &jobs {
            debug!("Job region {}", job.region);
        }

        engine::scoped::<T, _, _>(&self.config, |engine| {
            engine.submit(jobs.into_iter().map(|job| {
                let resolver = Arc::clone(&self.resolver);
                move || reduce(&*resolver, &job)
            }));

            match drive(engine, task) {
                DriveStatus::Cancelled => {
                    info!("{} of '{}' cancelled", operation, node.name());
                    Ok(None)
                }
                DriveStatus::Completed | DriveStatus::Failed => {
                    aggregate(engine.results(), engine.state()).map(Some)
                }
            }
        })?
    }
}
