//! Worker pool configuration
//!
//! Each reduction builds its own bounded Rayon pool from a [`ParallelConfig`]
//! and tears it down when the reduction returns, so nothing here touches the
//! global Rayon pool.

use crate::errors::{RegionStatsError, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Worker threads, and so the number of sub-regions per reduction.
    /// `None` means one per logical CPU.
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    #[must_use]
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Create a configuration that uses all available CPU cores
    #[must_use]
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    /// Create a configuration that uses a specific number of threads
    #[must_use]
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }

    /// Number of workers a reduction will use, never zero
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Build a dedicated pool with [`Self::worker_count`] threads
    ///
    /// # Errors
    ///
    /// Returns [`RegionStatsError::ThreadPoolError`] if the threads cannot be
    /// spawned.
    pub fn build_pool(&self) -> Result<ThreadPool> {
        let workers = self.worker_count();
        ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("region-worker-{index}"))
            .build()
            .map_err(|e| {
                RegionStatsError::ThreadPoolError(format!(
                    "Failed to initialize thread pool with {} threads: {}",
                    workers, e
                ))
            })
    }
}

/// Get information about the current parallel configuration
#[must_use]
pub fn get_parallel_info() -> ParallelInfo {
    ParallelInfo {
        available_cores: num_cpus::get(),
        physical_cores: num_cpus::get_physical(),
        available_parallelism: std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1),
    }
}

/// Information about the parallel processing environment
#[derive(Debug, Clone)]
pub struct ParallelInfo {
    pub available_cores: usize,
    pub physical_cores: usize,
    pub available_parallelism: usize,
}

impl ParallelInfo {
    /// Print parallel processing information
    pub fn print_info(&self) {
        println!("📊 Parallel Processing Information:");
        println!("   Available CPU cores: {}", self.available_cores);
        println!("   Physical CPU cores: {}", self.physical_cores);
        println!("   Available parallelism: {}", self.available_parallelism);
    }
}
