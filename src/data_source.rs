//! Image source abstraction
//!
//! The statistics never touch pixel storage directly. They talk to an
//! [`ImageNode`] for samples and its bounding box, and to a [`NodeResolver`]
//! to turn a node name back into a node inside each worker.
//!
//! Node handles are not required to be `Send`: only node names cross worker
//! boundaries, and every worker resolves its own handle.

use crate::errors::Result;
use std::sync::Arc;

pub use crate::bounds::BoundingBox;

/// A single image node that can be sampled per pixel
pub trait ImageNode {
    /// Name the node can be resolved by
    fn name(&self) -> &str;

    /// Region of the node that holds pixel data
    fn bbox(&self) -> Result<BoundingBox>;

    /// Read one channel value at `(x, y)`
    ///
    /// # Errors
    ///
    /// Implementations fail for unknown channels and coordinates outside the
    /// node's data.
    fn sample(&self, channel: &str, x: i32, y: i32) -> Result<f32>;
}

impl<N: ImageNode + ?Sized> ImageNode for Arc<N> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn bbox(&self) -> Result<BoundingBox> {
        (**self).bbox()
    }

    fn sample(&self, channel: &str, x: i32, y: i32) -> Result<f32> {
        (**self).sample(channel, x, y)
    }
}

/// Looks up nodes by name; shared by all workers of a reduction
pub trait NodeResolver: Send + Sync {
    type Node: ImageNode;

    /// Resolve a fresh handle to the named node
    ///
    /// # Errors
    ///
    /// Returns [`crate::RegionStatsError::NodeNotFound`] or a source specific
    /// error when the node cannot be opened.
    fn resolve(&self, node_name: &str) -> Result<Self::Node>;
}

impl<R: NodeResolver + ?Sized> NodeResolver for Arc<R> {
    type Node = R::Node;

    fn resolve(&self, node_name: &str) -> Result<Self::Node> {
        (**self).resolve(node_name)
    }
}
