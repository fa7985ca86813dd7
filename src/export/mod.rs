//! Output formats for an exported library.
//!
//! - CSV: one row per game with a fixed column order
//! - Prometheus: gauge families summarizing the library

mod games_csv;
mod prometheus;

pub use games_csv::{games_to_string, read_games_file, write_games_file};
pub use prometheus::{write_metrics, MetricsSnapshot};
