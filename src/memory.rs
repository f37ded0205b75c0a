//! In-memory image nodes backed by `ndarray` buffers

use crate::bounds::BoundingBox;
use crate::data_source::{ImageNode, NodeResolver};
use crate::errors::{RegionStatsError, Result};
use ndarray::Array2;
use std::collections::HashMap;
use std::sync::Arc;

/// An image whose channels are `[row, column]` arrays placed at an origin
#[derive(Debug, Clone)]
pub struct MemoryImage {
    name: String,
    origin: (i32, i32),
    shape: (usize, usize),
    channels: HashMap<String, Array2<f32>>,
}

impl MemoryImage {
    /// Create an empty image of `width` x `height` pixels with its lower
    /// corner at `origin`
    pub fn new(name: impl Into<String>, origin: (i32, i32), width: usize, height: usize) -> Self {
        Self {
            name: name.into(),
            origin,
            shape: (height, width),
            channels: HashMap::new(),
        }
    }

    /// Add or replace a channel
    ///
    /// # Errors
    ///
    /// Returns [`RegionStatsError::InvalidRegion`] if the array shape does not
    /// match the image size.
    pub fn with_channel(mut self, channel: impl Into<String>, data: Array2<f32>) -> Result<Self> {
        if data.dim() != self.shape {
            return Err(RegionStatsError::InvalidRegion {
                message: format!(
                    "channel shape {:?} does not match image '{}' of shape {:?}",
                    data.dim(),
                    self.name,
                    self.shape
                ),
            });
        }
        self.channels.insert(channel.into(), data);
        Ok(self)
    }

    /// Add a channel computed from pixel coordinates
    pub fn with_channel_fn<F>(self, channel: impl Into<String>, f: F) -> Result<Self>
    where
        F: Fn(i32, i32) -> f32,
    {
        let (ox, oy) = self.origin;
        let data = Array2::from_shape_fn(self.shape, |(row, col)| {
            f(ox + col as i32, oy + row as i32)
        });
        self.with_channel(channel, data)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }
}

impl ImageNode for MemoryImage {
    fn name(&self) -> &str {
        &self.name
    }

    fn bbox(&self) -> Result<BoundingBox> {
        let (height, width) = self.shape;
        let size = |len: usize| {
            u32::try_from(len).map_err(|_| RegionStatsError::InvalidRegion {
                message: format!("image '{}' is too large", self.name),
            })
        };
        Ok(BoundingBox::new(
            self.origin.0,
            self.origin.1,
            size(width)?,
            size(height)?,
        ))
    }

    fn sample(&self, channel: &str, x: i32, y: i32) -> Result<f32> {
        let data = self
            .channels
            .get(channel)
            .ok_or_else(|| RegionStatsError::ChannelNotFound {
                node: self.name.clone(),
                channel: channel.to_string(),
            })?;

        let col = usize::try_from(i64::from(x) - i64::from(self.origin.0)).ok();
        let row = usize::try_from(i64::from(y) - i64::from(self.origin.1)).ok();
        row.zip(col)
            .and_then(|(row, col)| data.get((row, col)).copied())
            .ok_or_else(|| RegionStatsError::SampleOutOfBounds {
                node: self.name.clone(),
                x,
                y,
            })
    }
}

/// Registry of shared in-memory images, resolvable by name
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    nodes: HashMap<String, Arc<MemoryImage>>,
}

impl MemoryHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image under its own name and return the shared handle
    pub fn insert(&mut self, image: MemoryImage) -> Arc<MemoryImage> {
        let image = Arc::new(image);
        self.nodes.insert(image.name().to_string(), Arc::clone(&image));
        image
    }

    #[must_use]
    pub fn get(&self, node_name: &str) -> Option<Arc<MemoryImage>> {
        self.nodes.get(node_name).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeResolver for MemoryHost {
    type Node = Arc<MemoryImage>;

    fn resolve(&self, node_name: &str) -> Result<Self::Node> {
        self.get(node_name)
            .ok_or_else(|| RegionStatsError::NodeNotFound {
                node: node_name.to_string(),
            })
    }
}
