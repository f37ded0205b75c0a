//! Core statistical types
//!
//! This module defines the operations, job descriptors and partial results
//! shared by the worker reductions and the aggregator.

use crate::bounds::Bounds;
use std::fmt;

/// Supported region statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatOperation {
    /// Value-weighted centroid
    Centroid,
    /// Maximum value
    MaxValue,
}

impl StatOperation {
    /// Get the string representation of the operation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Centroid => "centroid",
            Self::MaxValue => "max value",
        }
    }

    /// Message shown on the host's progress widget
    #[must_use]
    pub const fn progress_message(self) -> &'static str {
        match self {
            Self::Centroid => "Calculating centroid...",
            Self::MaxValue => "Calculating max value...",
        }
    }
}

impl fmt::Display for StatOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed arguments of one worker job
///
/// Only the node name travels to the worker; the worker resolves its own
/// handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionJob {
    pub region: Bounds,
    pub node_name: String,
    pub channel: String,
    pub step: usize,
}

impl RegionJob {
    pub fn new(
        region: Bounds,
        node_name: impl Into<String>,
        channel: impl Into<String>,
        step: usize,
    ) -> Self {
        Self {
            region,
            node_name: node_name.into(),
            channel: channel.into(),
            step,
        }
    }
}

/// Running weighted means over one sub-region
///
/// `mean_x` and `mean_y` are means of `weight * x` and `weight * y`, so
/// `mean_x / mean_weight` is the weighted centroid of the samples seen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CentroidPartial {
    pub mean_x: f64,
    pub mean_y: f64,
    pub mean_weight: f64,
    pub samples: u64,
}

impl CentroidPartial {
    /// Fold one sample into the running means
    pub fn push(&mut self, x: f64, y: f64, weight: f64) {
        self.samples += 1;
        let n = self.samples as f64;
        self.mean_weight += (weight - self.mean_weight) / n;
        self.mean_x += (weight * x - self.mean_x) / n;
        self.mean_y += (weight * y - self.mean_y) / n;
    }

    /// Combine two partials as if all samples had been pushed into one
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        let samples = self.samples + other.samples;
        if samples == 0 {
            return Self::default();
        }

        let share = other.samples as f64 / samples as f64;
        Self {
            mean_x: self.mean_x + (other.mean_x - self.mean_x) * share,
            mean_y: self.mean_y + (other.mean_y - self.mean_y) * share,
            mean_weight: self.mean_weight + (other.mean_weight - self.mean_weight) * share,
            samples,
        }
    }

    /// Weighted centroid, or the raw means of `weight * x` and `weight * y`
    /// when the total weight is zero or negative
    #[must_use]
    pub fn centroid(&self) -> Centroid {
        if self.mean_weight > 0.0 {
            Centroid {
                x: self.mean_x / self.mean_weight,
                y: self.mean_y / self.mean_weight,
            }
        } else {
            Centroid {
                x: self.mean_x,
                y: self.mean_y,
            }
        }
    }
}

/// Final centroid in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
}

impl From<Centroid> for (f64, f64) {
    fn from(c: Centroid) -> Self {
        (c.x, c.y)
    }
}

impl fmt::Display for Centroid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}
