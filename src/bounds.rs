//! Inclusive pixel regions and region partitioning
//!
//! [`Bounds`] is the inclusive rectangle a reduction runs over. It is built
//! from the [`BoundingBox`] a node reports and split into independent
//! sub-regions, one per worker, by [`Bounds::partition`].

use crate::errors::{RegionStatsError, Result};
use std::fmt;

/// Bounding box as reported by an image node: origin plus size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Inclusive integer rectangle `(x1, y1)..=(x2, y2)`
///
/// The invariant `x1 <= x2 && y1 <= y2` is checked on construction and the
/// fields cannot be changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bounds {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
}

impl Bounds {
    /// Create a region from its inclusive corners
    ///
    /// # Errors
    ///
    /// Returns [`RegionStatsError::InvalidRegion`] if `x1 > x2` or `y1 > y2`.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Result<Self> {
        if x1 > x2 || y1 > y2 {
            return Err(RegionStatsError::InvalidRegion {
                message: format!("({x1}, {y1}, {x2}, {y2}) has inverted corners"),
            });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// Convert a node bounding box into an inclusive region
    ///
    /// # Errors
    ///
    /// Returns [`RegionStatsError::InvalidRegion`] for an empty box or one whose
    /// far corner does not fit in `i32`.
    pub fn from_bbox(bbox: BoundingBox) -> Result<Self> {
        if bbox.width == 0 || bbox.height == 0 {
            return Err(RegionStatsError::InvalidRegion {
                message: format!(
                    "bounding box {}x{} at ({}, {}) is empty",
                    bbox.width, bbox.height, bbox.x, bbox.y
                ),
            });
        }

        let far = |origin: i32, len: u32| {
            i32::try_from(i64::from(origin) + i64::from(len) - 1).map_err(|_| {
                RegionStatsError::InvalidRegion {
                    message: format!("bounding box {bbox:?} overflows the pixel grid"),
                }
            })
        };

        Self::new(
            bbox.x,
            bbox.y,
            far(bbox.x, bbox.width)?,
            far(bbox.y, bbox.height)?,
        )
    }

    #[must_use]
    pub const fn x1(&self) -> i32 {
        self.x1
    }

    #[must_use]
    pub const fn y1(&self) -> i32 {
        self.y1
    }

    #[must_use]
    pub const fn x2(&self) -> i32 {
        self.x2
    }

    #[must_use]
    pub const fn y2(&self) -> i32 {
        self.y2
    }

    /// Number of pixel columns
    #[must_use]
    pub fn width(&self) -> usize {
        (i64::from(self.x2) - i64::from(self.x1) + 1) as usize
    }

    /// Number of pixel rows
    #[must_use]
    pub fn height(&self) -> usize {
        (i64::from(self.y2) - i64::from(self.y1) + 1) as usize
    }

    /// Number of pixels covered, saturating at `u64::MAX` for the full `i32`
    /// plane
    #[must_use]
    pub fn area(&self) -> u64 {
        self.sample_count(1)
    }

    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    /// Number of pixels visited when sampling every `step`-th row and column
    #[must_use]
    pub fn sample_count(&self, step: usize) -> u64 {
        let step = step.max(1) as u64;
        let lanes = |lo: i32, hi: i32| ((i64::from(hi) - i64::from(lo) + 1) as u64).div_ceil(step);
        lanes(self.x1, self.x2).saturating_mul(lanes(self.y1, self.y2))
    }

    /// Row-major sample coordinates, starting at `(x1, y1)` and stepping by
    /// `step` in both axes
    pub fn sample_points(&self, step: usize) -> impl Iterator<Item = (i32, i32)> {
        let step = step.max(1);
        let (x1, x2) = (self.x1, self.x2);
        (self.y1..=self.y2)
            .step_by(step)
            .flat_map(move |y| (x1..=x2).step_by(step).map(move |x| (x, y)))
    }

    /// Split into at most `parts` bands that exactly cover this region
    #[must_use]
    pub fn partition(&self, parts: usize) -> Vec<Bounds> {
        self.partition_aligned(parts, 1)
    }

    /// Split into at most `parts` bands, cutting only on the `step` sampling
    /// grid of this region
    ///
    /// Bands run along the longer axis and differ in size by at most one
    /// sample lane. Every band starts on a sample lane of the parent, so the
    /// bands together visit exactly the samples the parent would visit.
    /// A region with fewer lanes than `parts` yields one band per lane.
    #[must_use]
    pub fn partition_aligned(&self, parts: usize, step: usize) -> Vec<Bounds> {
        let parts = parts.max(1);
        let step = step.max(1);
        let split_rows = self.height() >= self.width();
        let (start, end, extent) = if split_rows {
            (self.y1, self.y2, self.height())
        } else {
            (self.x1, self.x2, self.width())
        };

        let lanes = extent.div_ceil(step);
        let bands = parts.min(lanes);
        let base = lanes / bands;
        let extra = lanes % bands;

        let offset = |lane: usize| (i64::from(start) + (lane * step) as i64) as i32;

        let mut regions = Vec::with_capacity(bands);
        let mut lane = 0;
        for band in 0..bands {
            let lo = offset(lane);
            lane += base + usize::from(band < extra);
            let hi = if band + 1 == bands {
                end
            } else {
                offset(lane) - 1
            };

            regions.push(if split_rows {
                Bounds {
                    x1: self.x1,
                    y1: lo,
                    x2: self.x2,
                    y2: hi,
                }
            } else {
                Bounds {
                    x1: lo,
                    y1: self.y1,
                    x2: hi,
                    y2: self.y2,
                }
            });
        }

        regions
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]..=[{}, {}]", self.x1, self.y1, self.x2, self.y2)
    }
}

impl TryFrom<BoundingBox> for Bounds {
    type Error = RegionStatsError;

    fn try_from(bbox: BoundingBox) -> Result<Self> {
        Self::from_bbox(bbox)
    }
}
