//! gametrack-data: export a GameTrack library to CSV and Prometheus metrics
//!
//! Reads the library from GameTrack's local database (or a remote API), writes
//! a CSV with a fixed column order, optionally a metrics file, and optionally
//! publishes the CSV to a GitHub branch for a static site to pick up.

mod app;
mod cli;
mod data;
mod error;
mod export;
mod network;

use anyhow::Result;
use cli::Cli;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "gametrack_data=info";

/// `RUST_LOG` wins outright; without it only this crate logs, at info
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn main() -> Result<()> {
    // Logs go to stderr so `metrics --metrics-filename -` output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse_args();
    app::run(cli)
}
