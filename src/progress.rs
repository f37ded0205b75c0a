//! Progress reporting and cooperative cancellation
//!
//! [`drive`] is the caller-side loop of a reduction: between blocking waits on
//! the engine it checks the host's cancellation flag and reports how many jobs
//! have come back.

use crate::engine::ReductionEngine;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Host-side progress widget
pub trait ProgressTask {
    /// Report progress in percent, `0..=100`
    fn set_progress(&mut self, percent: u8);

    /// True once the user asked to stop
    fn is_cancelled(&self) -> bool;
}

/// Shared cancellation flag
///
/// Clones observe the same flag, so one can be handed to another thread (or a
/// signal handler) while the driver loop polls the other.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Progress task that reports nothing
#[derive(Debug, Clone, Default)]
pub struct SilentProgress {
    token: CancellationToken,
}

impl SilentProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel through `token` instead of never
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl ProgressTask for SilentProgress {
    fn set_progress(&mut self, _percent: u8) {}

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Progress task that logs each percentage change
#[derive(Debug, Clone)]
pub struct ConsoleProgress {
    message: String,
    last: Option<u8>,
    token: CancellationToken,
}

impl ConsoleProgress {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            last: None,
            token: CancellationToken::new(),
        }
    }

    /// Handle that cancels this task
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    #[must_use]
    pub fn last_progress(&self) -> Option<u8> {
        self.last
    }
}

impl ProgressTask for ConsoleProgress {
    fn set_progress(&mut self, percent: u8) {
        if self.last != Some(percent) {
            info!("{} {}%", self.message, percent);
            self.last = Some(percent);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// How a driven reduction ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveStatus {
    /// Every job reported
    Completed,
    /// The task was cancelled and the engine aborted
    Cancelled,
    /// A job failed; the remaining jobs were aborted
    Failed,
}

/// Percentage of `completed` out of `total`, clamped to 100
#[must_use]
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = completed.min(total) * 100 / total;
    percent as u8
}

/// Poll `engine` until it is done, forwarding progress and cancellation
/// between `task` and the engine
pub fn drive<T: Send + 'static>(
    engine: &mut ReductionEngine<'_, '_, T>,
    task: &mut dyn ProgressTask,
) -> DriveStatus {
    let total = engine.processes();
    task.set_progress(0);

    while engine.is_working() {
        if task.is_cancelled() {
            engine.abort();
            return DriveStatus::Cancelled;
        }

        let failed = match engine.poll_one() {
            Some(result) => !result.is_ok(),
            None => break,
        };
        task.set_progress(progress_percent(engine.completed(), total));

        if failed {
            warn!("A job failed; abandoning the remaining work");
            engine.abort();
            return DriveStatus::Failed;
        }
    }

    DriveStatus::Completed
}
