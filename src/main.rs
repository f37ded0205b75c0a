//! Entry point for the region-stats application.
//! Handles CLI parsing, logging setup, node loading, and dispatches the centroid and max value reductions.

use chrono::Utc;
use clap::Parser;
use flexi_logger::Logger;
use region_stats::metadata::{describe_node, print_node_description};
use region_stats::netcdf_io::{NetCDFNode, NetCDFResolver};
use region_stats::parallel::{get_parallel_info, ParallelConfig};
use region_stats::progress::ConsoleProgress;
use region_stats::statistics::{RegionStats, StatOperation};
use region_stats::ImageNode;
use serde_json::{json, Value};

mod cli;

use cli::Args;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    let _logger = Logger::try_with_env_or_str(level)?
        .log_to_stderr()
        .start()?;

    if !args.json {
        println!(
            r#"
------------------------------------------------------------------
                  region-stats
        parallel centroid / max value of image channels
------------------------------------------------------------------
"#
        );
    }

    if args.verbose {
        get_parallel_info().print_info();
    }

    if args.list_channels || !args.wants_statistics() {
        let description = describe_node(&args.file)?;
        print_node_description(&description);
        return Ok(());
    }

    let channel = args
        .channel
        .as_deref()
        .ok_or("A channel is required: use --channel <name>")?;

    let node = NetCDFNode::open(&args.file)?;
    if !args.json {
        println!("Successfully opened node: {}", args.file.display());
    }

    let config = ParallelConfig::new(args.threads);
    let workers = config.worker_count();
    let stats = RegionStats::new(NetCDFResolver::new()).with_config(config);

    let mut report = json!({
        "node": node.name(),
        "channel": channel,
        "step": args.step,
        "workers": workers,
        "computed_at": Utc::now().to_rfc3339(),
    });

    if args.centroid {
        let mut task = ConsoleProgress::new(StatOperation::Centroid.progress_message());
        let centroid = stats.centroid(&node, channel, args.step, &mut task)?;
        report["centroid"] = match centroid {
            Some(c) => json!({ "x": c.x, "y": c.y }),
            None => Value::Null,
        };
        if !args.json {
            match centroid {
                Some(c) => println!("✅ Centroid of '{}': {}", channel, c),
                None => println!("⚠ Centroid calculation cancelled"),
            }
        }
    }

    if args.max {
        let mut task = ConsoleProgress::new(StatOperation::MaxValue.progress_message());
        let max = stats.max_value(&node, channel, args.step, &mut task)?;
        report["max_value"] = max.map_or(Value::Null, |v| json!(v));
        if !args.json {
            match max {
                Some(v) => println!("✅ Max value of '{}': {}", channel, v),
                None => println!("⚠ Max value calculation cancelled"),
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if args.step > 1 {
        println!(
            "💡 Sampled every {} pixels; use --step 1 for exact results",
            args.step
        );
    }

    Ok(())
}
