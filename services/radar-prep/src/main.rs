//! Radar observation preprocessor.
//!
//! Grids Level-II radar volumes onto a conformal conic analysis grid,
//! masks them, and writes observation stores for data assimilation.

mod commands;
mod config_loader;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "radar-prep")]
#[command(about = "Superobservation gridding of radar volumes")]
struct Args {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "RADAR_PREP_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Grid, mask and write observations for one file or a directory
    Process(ProcessArgs),
    /// Concatenate observation stores from many radars
    Combine(CombineArgs),
}

#[derive(ClapArgs, Debug, Default)]
pub struct ProcessArgs {
    /// YAML configuration file
    #[arg(short, long, env = "RADAR_PREP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Single volume file to process
    #[arg(short, long, conflicts_with = "dir")]
    pub file: Option<PathBuf>,

    /// Directory of volume files to process
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Analysis time YYYY,MM,DD,HH,MM; picks the closest volume in the window
    #[arg(long, requires = "dir")]
    pub window: Option<String>,

    /// Output directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Weight function: cressman, barnes or gaspari-cohn
    #[arg(long)]
    pub method: Option<String>,

    /// Grid spacing in meters; also sets the ROI to dx / 0.707
    #[arg(long)]
    pub dx: Option<f64>,

    /// Radius of influence in meters
    #[arg(long)]
    pub roi: Option<f64>,

    /// Velocity unfolding: region, phase or none
    #[arg(short, long)]
    pub unfold: Option<String>,

    /// Only write radial velocity observations
    #[arg(long)]
    pub only_vr: bool,

    /// Worker threads for directory runs
    #[arg(long)]
    pub threads: Option<usize>,
}

#[derive(ClapArgs, Debug)]
pub struct CombineArgs {
    /// Directory holding the stores
    #[arg(short, long)]
    pub dir: PathBuf,

    /// File name suffix to match, e.g. VR_20230510_2130.zarr
    #[arg(short, long)]
    pub suffix: String,

    /// Output store (default: obs_seq_<suffix> in the same directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Field to combine
    #[arg(long, default_value = "velocity")]
    pub field: String,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    match args.log_format {
        LogFormat::Json => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .json()
            .init(),
        LogFormat::Pretty => fmt().with_env_filter(filter).with_target(false).init(),
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting radar-prep");

    match args.command {
        Command::Process(process) => commands::process(&process),
        Command::Combine(combine) => commands::combine(&combine),
    }
}
