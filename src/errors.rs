//! Centralized error handling for region_stats
//!
//! Every fallible operation in the crate returns [`Result`]. Errors raised by a
//! worker are captured as values and later folded into a single
//! [`RegionStatsError::ReductionFailed`] by the aggregator.

use std::fmt;

/// Main error type for region_stats operations
#[derive(Debug)]
pub enum RegionStatsError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// No node with this name is known to the resolver
    NodeNotFound { node: String },

    /// The node has no channel with this name
    ChannelNotFound { node: String, channel: String },

    /// A sample was requested outside the node's pixel data
    SampleOutOfBounds { node: String, x: i32, y: i32 },

    /// Invalid region or bounding box
    InvalidRegion { message: String },

    /// Sampling step must be at least 1
    InvalidStep(usize),

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// A job panicked inside a worker
    WorkerPanicked { job: usize, message: String },

    /// Consolidated failure of a whole reduction, carrying the first job error
    ReductionFailed {
        operation: &'static str,
        job: Option<usize>,
        message: String,
    },

    /// Generic error for ad-hoc messages
    Generic(String),
}

impl fmt::Display for RegionStatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionStatsError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            RegionStatsError::IoError(e) => write!(f, "I/O error: {}", e),
            RegionStatsError::ArrayError(e) => write!(f, "Array error: {}", e),
            RegionStatsError::NodeNotFound { node } => write!(f, "Node '{}' not found", node),
            RegionStatsError::ChannelNotFound { node, channel } => {
                write!(f, "Channel '{}' not found in node '{}'", channel, node)
            }
            RegionStatsError::SampleOutOfBounds { node, x, y } => {
                write!(f, "Sample ({}, {}) is outside node '{}'", x, y, node)
            }
            RegionStatsError::InvalidRegion { message } => write!(f, "Invalid region: {}", message),
            RegionStatsError::InvalidStep(step) => {
                write!(f, "Invalid sampling step {}: step must be at least 1", step)
            }
            RegionStatsError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            RegionStatsError::WorkerPanicked { job, message } => {
                write!(f, "Job {} panicked: {}", job, message)
            }
            RegionStatsError::ReductionFailed {
                operation,
                job,
                message,
            } => match job {
                Some(job) => write!(f, "Failed to compute {} (job {}): {}", operation, job, message),
                None => write!(f, "Failed to compute {}: {}", operation, message),
            },
            RegionStatsError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RegionStatsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegionStatsError::NetCDFError(e) => Some(e),
            RegionStatsError::IoError(e) => Some(e),
            RegionStatsError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for RegionStatsError {
    fn from(error: netcdf::Error) -> Self {
        RegionStatsError::NetCDFError(error)
    }
}

impl From<std::io::Error> for RegionStatsError {
    fn from(error: std::io::Error) -> Self {
        RegionStatsError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for RegionStatsError {
    fn from(error: ndarray::ShapeError) -> Self {
        RegionStatsError::ArrayError(error)
    }
}

impl From<String> for RegionStatsError {
    fn from(error: String) -> Self {
        RegionStatsError::Generic(error)
    }
}

impl From<&str> for RegionStatsError {
    fn from(error: &str) -> Self {
        RegionStatsError::Generic(error.to_string())
    }
}

/// Result type alias for region_stats operations
pub type Result<T> = std::result::Result<T, RegionStatsError>;
