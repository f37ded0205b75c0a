//! NetCDF node inspection
//!
//! Lists what a file offers as an image node: its bounding box, the variables
//! usable as channels, and the variables that are not.

use crate::bounds::BoundingBox;
use crate::data_source::ImageNode;
use crate::errors::Result;
use crate::netcdf_io::NetCDFNode;
use std::path::Path;

/// Information about a dimension
#[derive(Debug, Clone)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

/// A variable of the file and whether it can be sampled as a channel
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub name: String,
    pub data_type: String,
    pub dimensions: Vec<DimensionInfo>,
    pub is_channel: bool,
}

/// Structured description of a NetCDF node
#[derive(Debug, Clone)]
pub struct NodeDescription {
    pub name: String,
    pub bbox: BoundingBox,
    pub variables: Vec<ChannelInfo>,
}

impl NodeDescription {
    /// Names of the variables usable as channels
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.variables
            .iter()
            .filter(|v| v.is_channel)
            .map(|v| v.name.as_str())
    }
}

/// Describe the node stored at `path`
///
/// # Errors
///
/// Fails if the file cannot be opened as a node.
pub fn describe_node(path: impl AsRef<Path>) -> Result<NodeDescription> {
    let node = NetCDFNode::open(path.as_ref())?;
    let channels = node.channel_names();

    let mut variables: Vec<ChannelInfo> = node
        .file()
        .variables()
        .map(|var| {
            let name = var.name();
            ChannelInfo {
                is_channel: channels.contains(&name),
                data_type: format!("{:?}", var.vartype()).to_lowercase(),
                dimensions: var
                    .dimensions()
                    .iter()
                    .map(|d| DimensionInfo {
                        name: d.name(),
                        length: d.len(),
                        is_unlimited: d.is_unlimited(),
                    })
                    .collect(),
                name,
            }
        })
        .collect();
    variables.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(NodeDescription {
        name: node.name().to_string(),
        bbox: node.bbox()?,
        variables,
    })
}

/// Prints the bounding box and channels of a node.
pub fn print_node_description(description: &NodeDescription) {
    let bbox = description.bbox;
    println!("\n Node: {}", description.name);
    println!("={}", "=".repeat(description.name.len() + 7));
    println!(
        "    Bounding box: x={} y={} {}x{}",
        bbox.x, bbox.y, bbox.width, bbox.height
    );

    println!("\n Channels");
    println!("============");
    if description.channels().next().is_none() {
        println!("   (No channels found)");
    }
    for var in description.variables.iter().filter(|v| v.is_channel) {
        println!("    {} ({})", var.name, var.data_type);
    }

    let others: Vec<&ChannelInfo> = description
        .variables
        .iter()
        .filter(|v| !v.is_channel)
        .collect();
    if !others.is_empty() {
        println!("\n Other variables");
        println!("===================");
        for var in others {
            let dims: Vec<String> = var
                .dimensions
                .iter()
                .map(|d| format!("{}[{}]", d.name, d.length))
                .collect();
            println!("    {} ({}): ({})", var.name, var.data_type, dims.join(", "));
        }
    }

    println!("\n💡 Tip: Use --channel <name> --centroid or --max to compute statistics");
    println!("💡 Tip: Use --threads <N> to control parallel processing threads");
}
