//! Pairfield Application
//!
//! Prepares paired-object unsigned distance field datasets.
//!
//! For every scene (two meshes plus an interaction box) this writes:
//! - Jointly normalized surface point clouds for both objects
//! - Stratified query points with distances to each surface (`.npz`)
//! - The normalization transform, and optionally the interaction surface

mod app;
mod config;

use app::{AppBuilder, LoggingConfig};
use clap::Parser;
use std::path::PathBuf;

/// Pairfield - paired distance-field dataset preparation
#[derive(Parser, Debug)]
#[command(name = "pairfield")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON run configuration
    #[arg(short, long, default_value = "config/pairfield.json")]
    config: PathBuf,

    /// Random seed, overriding the config
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of scenes processed in parallel, overriding the config
    #[arg(short, long)]
    workers: Option<usize>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Send spans to Tracy (needs the `tracy` feature)
    #[arg(long)]
    tracy: bool,
}

fn main() {
    let args = Args::parse();

    let result = AppBuilder::new()
        .with_config_path(args.config)
        .with_seed(args.seed)
        .with_workers(args.workers)
        .with_logging(LoggingConfig {
            level: args.log_level,
            enable_tracy: args.tracy,
        })
        .run();

    // scene failures are reported in the log; only config errors are fatal
    if let Err(e) = result {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    }
}
