use anyhow::{anyhow, Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use robocast_rust_sdk::robocast_rust_sdk::cli_common::CommonArgs;
use robocast_rust_sdk::robocast_rust_sdk::{process_rosbag, JobConfig};
use tracing_subscriber::EnvFilter;

/// Extract images, IMU samples, poses and transforms from a ROS 2 MCAP bag.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// YAML job file. Other flags override what it sets.
    #[arg(short, long)]
    config: Option<Utf8PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let base = match &args.config {
        Some(path) => Some(
            JobConfig::from_file(path).with_context(|| format!("Failed to load job {}", path))?,
        ),
        None => None,
    };
    let job = args.common.apply(base).map_err(|e| anyhow!(e))?;

    let summary = process_rosbag(&job)?;
    if let Some(images) = summary.images {
        println!("{} images written", images);
    }
    if let Some(rows) = summary.imu_rows {
        println!("{} imu rows written", rows);
    }
    if let Some(rows) = summary.pose_rows {
        println!("{} pose rows written", rows);
    }
    if let (Some(frames), Some(samples)) = (summary.transform_frames, summary.transform_samples) {
        println!("{} transforms over {} frames written", samples, frames);
    }
    Ok(())
}
