//! NetCDF files as image nodes
//!
//! A file is one node, named by its path. Every 2-D variable with dimensions
//! `[y, x]` is a channel. The pixel origin comes from the optional global
//! integer attributes `x_origin` and `y_origin`.
//!
//! `netcdf::File` handles stay inside the worker that opened them: the
//! [`NetCDFResolver`] opens a fresh [`NetCDFNode`] for every resolution. Channel
//! arrays are shared instead. The first node to sample a channel reads it from
//! disk, and every other node of the same resolver reuses that copy.

use crate::bounds::BoundingBox;
use crate::data_source::{ImageNode, NodeResolver};
use crate::errors::{RegionStatsError, Result};
use log::debug;
use ndarray::Array2;
use netcdf::{AttributeValue, File, Variable};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Global attribute holding the x coordinate of the first column
pub const X_ORIGIN_ATTR: &str = "x_origin";
/// Global attribute holding the y coordinate of the first row
pub const Y_ORIGIN_ATTR: &str = "y_origin";

type SharedChannels = Arc<Mutex<HashMap<(PathBuf, String), Arc<Array2<f32>>>>>;

/// Opens NetCDF nodes by path, optionally relative to a root directory
///
/// Clones share one channel cache.
#[derive(Clone, Default)]
pub struct NetCDFResolver {
    root: Option<PathBuf>,
    channels: SharedChannels,
}

impl std::fmt::Debug for NetCDFResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetCDFResolver")
            .field("root", &self.root)
            .field("cached_channels", &self.cached_channels())
            .finish()
    }
}

impl NetCDFResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative node names against `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Number of channel arrays held in memory
    pub fn cached_channels(&self) -> usize {
        lock(&self.channels).len()
    }

    /// Drop every cached channel, so the next reduction rereads the files
    pub fn clear_cache(&self) {
        lock(&self.channels).clear();
    }

    fn path_for(&self, node_name: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(node_name),
            None => PathBuf::from(node_name),
        }
    }
}

impl NodeResolver for NetCDFResolver {
    type Node = NetCDFNode;

    fn resolve(&self, node_name: &str) -> Result<Self::Node> {
        let path = self.path_for(node_name);
        if !path.exists() {
            return Err(RegionStatsError::NodeNotFound {
                node: node_name.to_string(),
            });
        }
        NetCDFNode::open_named(&path, node_name, Arc::clone(&self.channels))
    }
}

/// An open NetCDF file sampled as an image
///
/// Channels are read in full on first use. Nodes opened by the same
/// [`NetCDFResolver`] share what was read.
pub struct NetCDFNode {
    name: String,
    path: PathBuf,
    file: File,
    bbox: BoundingBox,
    shared: SharedChannels,
    channels: RefCell<HashMap<String, Arc<Array2<f32>>>>,
}

impl std::fmt::Debug for NetCDFNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetCDFNode")
            .field("name", &self.name)
            .field("bbox", &self.bbox)
            .finish_non_exhaustive()
    }
}

impl NetCDFNode {
    /// Open a file as a node named by its path
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or has no 2-D variable to take the
    /// image size from.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::open_named(path, &path.to_string_lossy(), SharedChannels::default())
    }

    fn open_named(path: &Path, name: &str, shared: SharedChannels) -> Result<Self> {
        let file = netcdf::open(path)?;
        let (height, width) = image_shape(&file)?;
        let x = origin_attribute(&file, X_ORIGIN_ATTR)?;
        let y = origin_attribute(&file, Y_ORIGIN_ATTR)?;

        let size = |len: usize| {
            u32::try_from(len).map_err(|_| RegionStatsError::InvalidRegion {
                message: format!("node '{}' is too large", name),
            })
        };
        let bbox = BoundingBox::new(x, y, size(width)?, size(height)?);
        debug!("Opened NetCDF node '{}' with {:?}", name, bbox);

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            file,
            bbox,
            shared,
            channels: RefCell::new(HashMap::new()),
        })
    }

    pub(crate) fn file(&self) -> &File {
        &self.file
    }

    /// Names of the variables usable as channels, sorted
    #[must_use]
    pub fn channel_names(&self) -> Vec<String> {
        let shape = (self.bbox.height as usize, self.bbox.width as usize);
        let mut names: Vec<String> = self
            .file
            .variables()
            .filter(|var| variable_shape(var) == Some(shape))
            .map(|var| var.name())
            .collect();
        names.sort();
        names
    }

    fn load_channel(&self, channel: &str) -> Result<Array2<f32>> {
        let var = self
            .file
            .variable(channel)
            .ok_or_else(|| RegionStatsError::ChannelNotFound {
                node: self.name.clone(),
                channel: channel.to_string(),
            })?;

        let shape = (self.bbox.height as usize, self.bbox.width as usize);
        if variable_shape(&var) != Some(shape) {
            return Err(RegionStatsError::InvalidRegion {
                message: format!(
                    "channel '{}' of node '{}' is not a {}x{} image",
                    channel, self.name, shape.1, shape.0
                ),
            });
        }

        let values = var.get_values::<f32, _>(..)?;
        debug!("Loaded channel '{}' of '{}' ({} values)", channel, self.name, values.len());
        Ok(Array2::from_shape_vec(shape, values)?)
    }

    /// The channel from the shared cache, reading it on a miss
    ///
    /// The cache stays locked during the read so concurrent workers wait for
    /// one copy instead of each reading their own.
    fn shared_channel(&self, channel: &str) -> Result<Arc<Array2<f32>>> {
        let mut shared = lock(&self.shared);
        let key = (self.path.clone(), channel.to_string());
        if let Some(data) = shared.get(&key) {
            return Ok(Arc::clone(data));
        }

        let data = Arc::new(self.load_channel(channel)?);
        shared.insert(key, Arc::clone(&data));
        Ok(data)
    }
}

impl ImageNode for NetCDFNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn bbox(&self) -> Result<BoundingBox> {
        Ok(self.bbox)
    }

    fn sample(&self, channel: &str, x: i32, y: i32) -> Result<f32> {
        if !self.channels.borrow().contains_key(channel) {
            let data = self.shared_channel(channel)?;
            self.channels.borrow_mut().insert(channel.to_string(), data);
        }

        let channels = self.channels.borrow();
        let col = usize::try_from(i64::from(x) - i64::from(self.bbox.x)).ok();
        let row = usize::try_from(i64::from(y) - i64::from(self.bbox.y)).ok();
        row.zip(col)
            .and_then(|(row, col)| channels.get(channel)?.get((row, col)).copied())
            .ok_or_else(|| RegionStatsError::SampleOutOfBounds {
                node: self.name.clone(),
                x,
                y,
            })
    }
}

// Entries are only ever inserted whole, so a poisoned cache is still usable.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `(rows, columns)` of a 2-D variable
fn variable_shape(var: &Variable) -> Option<(usize, usize)> {
    match var.dimensions() {
        [rows, cols] => Some((rows.len(), cols.len())),
        _ => None,
    }
}

/// Image size from the `y`/`x` dimensions, or else the first 2-D variable
fn image_shape(file: &File) -> Result<(usize, usize)> {
    if let (Some(rows), Some(cols)) = (file.dimension("y"), file.dimension("x")) {
        return Ok((rows.len(), cols.len()));
    }

    file.variables()
        .find_map(|var| variable_shape(&var))
        .ok_or_else(|| RegionStatsError::InvalidRegion {
            message: "file has no 2-D variable to sample".to_string(),
        })
}

fn origin_attribute(file: &File, name: &str) -> Result<i32> {
    let Some(attr) = file.attribute(name) else {
        return Ok(0);
    };

    match attr.value()? {
        AttributeValue::Int(v) => Ok(v),
        AttributeValue::Short(v) => Ok(i32::from(v)),
        AttributeValue::Longlong(v) => i32::try_from(v).map_err(|_| {
            RegionStatsError::InvalidRegion {
                message: format!("attribute '{}' = {} does not fit a pixel coordinate", name, v),
            }
        }),
        other => Err(RegionStatsError::InvalidRegion {
            message: format!("attribute '{}' must be an integer, found {:?}", name, other),
        }),
    }
}
