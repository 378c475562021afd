//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// lidar-sim - rotating multi-channel ray-cast LiDAR simulator
#[derive(Parser, Debug)]
#[command(
    name = "lidar-sim",
    author,
    version,
    about = "Ray-cast LiDAR simulator",
    long_about = "Ticks a rotating multi-channel ray-cast LiDAR against an analytic demo scene.\n\n\
                  Each tick produces one encoded point cloud frame with per-point groundtruth \n\
                  object ids, dispatched to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LIDAR_SIM_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LIDAR_SIM_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the simulation
    Run(RunArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "lidar.toml", env = "LIDAR_SIM_CONFIG")]
    pub config: PathBuf,

    /// Override simulation.max_ticks (0 = until interrupted)
    #[arg(long, env = "LIDAR_SIM_MAX_TICKS")]
    pub max_ticks: Option<u64>,

    /// Override simulation.tick_duration_s
    #[arg(long)]
    pub tick: Option<f64>,

    /// Pace ticks against the wall clock
    #[arg(long)]
    pub realtime: bool,

    /// Stop after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "LIDAR_SIM_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Frames buffered between the sensor and the dispatcher
    #[arg(long, default_value = "16", env = "LIDAR_SIM_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LIDAR_SIM_METRICS_PORT")]
    pub metrics_port: u16,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "lidar.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "lidar.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List the per-channel vertical angles
    #[arg(long)]
    pub channels: bool,
}

#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
