//! Defines command-line interface options using `clap` for the region-stats application.

use clap::Parser;
use std::path::PathBuf;

/// A CLI tool for region statistics of NetCDF image channels
#[derive(Parser, Debug)]
#[command(
    version,
    name = "region-stats",
    about = "Weighted centroid and maximum value of an image channel, computed in parallel"
)]
pub struct Args {
    /// Path to the NetCDF file holding the image node
    #[arg(short, long)]
    pub file: PathBuf,

    /// Channel (2-D variable) to compute statistics for
    #[arg(short, long)]
    pub channel: Option<String>,

    /// Compute the value-weighted centroid of the channel
    #[arg(long)]
    pub centroid: bool,

    /// Compute the maximum value of the channel
    #[arg(long)]
    pub max: bool,

    /// Sample every N-th row and column. Larger steps are faster approximations.
    #[arg(short, long, default_value_t = 1, value_parser = parse_step)]
    pub step: usize,

    /// Number of worker threads. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// List the channels and bounding box of the node
    #[arg(long)]
    pub list_channels: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// True if any statistic was requested
    pub fn wants_statistics(&self) -> bool {
        self.centroid || self.max
    }
}

fn parse_step(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("Invalid step: must be at least 1".to_string()),
        Ok(step) => Ok(step),
        Err(_) => Err(format!("Invalid step '{}': expected a positive integer", s)),
    }
}
