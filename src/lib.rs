//! region_stats: parallel, cancellable statistics over image regions
//!
//! Computes the value-weighted centroid and the maximum value of one channel
//! over the bounding box of an image node. The region is split into one band
//! per worker, the bands are reduced in parallel on a scoped Rayon pool, and
//! the partial results are combined in a numerically stable way. The caller
//! drives the reduction through a progress task that can cancel it at any
//! point between job completions.
//!
//! ## Key Features
//!
//! - **Parallel Processing**: One bounded Rayon pool per call, released on every exit path
//! - **Statistics**: Weighted centroid and maximum value, with optional sparse sampling
//! - **Cancellation**: Cooperative cancellation with progress reporting
//! - **Image Sources**: In-memory `ndarray` images and NetCDF files out of the box
//!
//! ## Module Organization
//!
//! - [`bounds`]: Inclusive regions and region partitioning
//! - [`data_source`]: Image node and resolver traits
//! - [`engine`]: Scoped job engine with abort support
//! - [`progress`]: Progress tasks, cancellation and the driver loop
//! - [`statistics`]: Worker reductions, aggregation and the public entry points
//! - [`memory`]: In-memory image nodes
//! - [`netcdf_io`]: NetCDF files as image nodes
//! - [`metadata`]: NetCDF node inspection
//! - [`parallel`]: Parallel processing configuration
//! - [`errors`]: Centralized error handling
//!
//! ## Usage
//!
//! ```rust
//! use region_stats::prelude::*;
//!
//! let mut host = MemoryHost::new();
//! let image = host.insert(
//!     MemoryImage::new("plate", (0, 0), 64, 32)
//!         .with_channel_fn("alpha", |x, y| if x == 10 && y == 20 { 1.0 } else { 0.0 })
//!         .unwrap(),
//! );
//!
//! let stats = RegionStats::new(host).with_config(ParallelConfig::with_threads(4));
//! let mut task = SilentProgress::new();
//!
//! let centroid = stats.centroid(&image, "alpha", 1, &mut task).unwrap().unwrap();
//! assert!((centroid.x - 10.0).abs() < 1e-9);
//! assert!((centroid.y - 20.0).abs() < 1e-9);
//!
//! let max = stats.max_value(&image, "alpha", 1, &mut task).unwrap();
//! assert_eq!(max, Some(1.0));
//! ```

// Core modules
pub mod bounds;
pub mod data_source;
pub mod engine;
pub mod errors;
pub mod memory;
pub mod metadata;
pub mod netcdf_io;
pub mod parallel;
pub mod progress;
pub mod statistics;

// Direct re-exports for the public API
pub use bounds::{Bounds, BoundingBox};
pub use data_source::{ImageNode, NodeResolver};
pub use errors::{RegionStatsError, Result};
pub use statistics::{Centroid, RegionStats};

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::bounds::{Bounds, BoundingBox};
    pub use crate::data_source::{ImageNode, NodeResolver};
    pub use crate::errors::{RegionStatsError, Result};
    pub use crate::memory::{MemoryHost, MemoryImage};
    pub use crate::netcdf_io::{NetCDFNode, NetCDFResolver};
    pub use crate::parallel::ParallelConfig;
    pub use crate::progress::{CancellationToken, ConsoleProgress, ProgressTask, SilentProgress};
    pub use crate::statistics::{Centroid, RegionStats, StatOperation};
}
