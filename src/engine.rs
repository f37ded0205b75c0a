//! Scoped reduction engine
//!
//! A [`ReductionEngine`] runs independent jobs on a bounded Rayon pool and
//! hands their outcomes back one at a time, so a driver loop can report
//! progress and cancel between completions.
//!
//! The engine only exists inside [`scoped`]. The pool is built when the scope
//! opens, every spawned job has returned by the time the scope closes, and the
//! pool is dropped on every exit path.
//!
//! ```rust
//! use region_stats::engine;
//! use region_stats::parallel::ParallelConfig;
//!
//! let total = engine::scoped::<u64, _, _>(&ParallelConfig::with_threads(2), |engine| {
//!     engine.submit((1..=4u64).map(|n| move || Ok(n * n)));
//!     engine.wait_all();
//!     engine
//!         .results()
//!         .iter()
//!         .filter_map(|r| r.outcome.as_ref().ok())
//!         .sum::<u64>()
//! })
//! .unwrap();
//! assert_eq!(total, 30);
//! ```

use crate::errors::{RegionStatsError, Result};
use crate::parallel::ParallelConfig;
use log::{debug, warn};
use rayon::Scope;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// Outcome of one job, tagged with its submission index
#[derive(Debug)]
pub struct JobResult<T> {
    pub job: usize,
    pub outcome: Result<T>,
}

impl<T> JobResult<T> {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Build a pool from `config`, run `op` with a fresh engine, and wait for
/// every dispatched job before returning
///
/// Jobs still queued when `op` returns without collecting them are skipped.
/// The same holds if `op` panics: the panic resumes once the running jobs
/// have finished.
///
/// # Errors
///
/// Returns [`RegionStatsError::ThreadPoolError`] if the pool cannot be built.
pub fn scoped<T, R, OP>(config: &ParallelConfig, op: OP) -> Result<R>
where
    T: Send + 'static,
    OP: FnOnce(&mut ReductionEngine<'_, '_, T>) -> R,
{
    let pool = config.build_pool()?;
    debug!(
        "Opened reduction pool with {} workers",
        pool.current_num_threads()
    );

    let output = pool.in_place_scope(|scope| {
        let mut engine = ReductionEngine::new(scope);
        op(&mut engine)
    });

    debug!("Reduction pool drained");
    Ok(output)
}

/// Dispatches jobs onto a scoped pool and collects their outcomes
pub struct ReductionEngine<'a, 'scope, T> {
    scope: &'a Scope<'scope>,
    sender: Sender<JobResult<T>>,
    receiver: Receiver<JobResult<T>>,
    abort: Arc<AtomicBool>,
    submitted: usize,
    results: Vec<JobResult<T>>,
    failed: bool,
    aborted: bool,
}

impl<'a, 'scope, T: Send + 'static> ReductionEngine<'a, 'scope, T> {
    fn new(scope: &'a Scope<'scope>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            scope,
            sender,
            receiver,
            abort: Arc::new(AtomicBool::new(false)),
            submitted: 0,
            results: Vec::new(),
            failed: false,
            aborted: false,
        }
    }

    /// Dispatch independent jobs onto the pool
    ///
    /// Returns the number of jobs accepted; nothing is accepted after
    /// [`Self::abort`].
    pub fn submit<I, F>(&mut self, jobs: I) -> usize
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Result<T> + Send + 'scope,
    {
        if self.aborted {
            warn!("Ignoring jobs submitted to an aborted engine");
            return 0;
        }

        let mut accepted = 0;
        for job in jobs {
            let index = self.submitted;
            let sender = self.sender.clone();
            let abort = Arc::clone(&self.abort);

            self.scope.spawn(move |_| {
                if abort.load(Ordering::Acquire) {
                    debug!("Skipping job {index}: engine aborted");
                    return;
                }

                let outcome = panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|payload| {
                    Err(RegionStatsError::WorkerPanicked {
                        job: index,
                        message: panic_message(payload.as_ref()),
                    })
                });

                // The engine may already be gone if the caller stopped collecting.
                let _ = sender.send(JobResult { job: index, outcome });
            });

            self.submitted += 1;
            accepted += 1;
        }

        debug!("Dispatched {accepted} jobs ({} total)", self.submitted);
        accepted
    }

    /// Block until one more job completes and return its result
    ///
    /// Returns `None` once nothing is outstanding or the engine was aborted.
    pub fn poll_one(&mut self) -> Option<&JobResult<T>> {
        if !self.is_working() {
            return None;
        }

        // The engine keeps its own sender alive, so `recv` only returns once a
        // job reports.
        let result = self.receiver.recv().ok()?;
        if let Err(e) = &result.outcome {
            debug!("Job {} failed: {}", result.job, e);
            self.failed = true;
        }
        self.results.push(result);
        self.results.last()
    }

    /// Collect every outstanding result
    pub fn wait_all(&mut self) {
        while self.poll_one().is_some() {}
    }

    /// True while jobs are outstanding and no abort was requested
    #[must_use]
    pub fn is_working(&self) -> bool {
        !self.aborted && self.results.len() < self.submitted
    }

    /// Stop dispatching queued jobs and stop collecting results
    ///
    /// Jobs already scanning run to completion; results collected so far
    /// remain available.
    pub fn abort(&mut self) {
        if !self.aborted {
            warn!(
                "Aborting reduction with {} of {} jobs collected",
                self.results.len(),
                self.submitted
            );
        }
        self.aborted = true;
        self.abort.store(true, Ordering::Release);
    }

    /// Results collected so far, in completion order
    #[must_use]
    pub fn results(&self) -> &[JobResult<T>] {
        &self.results
    }

    /// False if any job failed or the engine was aborted
    #[must_use]
    pub fn state(&self) -> bool {
        !self.failed && !self.aborted
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Number of jobs submitted
    #[must_use]
    pub fn processes(&self) -> usize {
        self.submitted
    }

    /// Number of results collected
    #[must_use]
    pub fn completed(&self) -> usize {
        self.results.len()
    }
}

impl<T> Drop for ReductionEngine<'_, '_, T> {
    fn drop(&mut self) {
        // Nobody will read what is still queued.
        self.abort.store(true, Ordering::Release);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
