//! Command-line interface argument parsing for gametrack-data.
//!
//! `export` is the default command, so both of these work:
//! - `gametrack-data --output-filename games.csv`
//! - `gametrack-data export --output-filename games.csv --gh-repo owner/name`
//!
//! Settings missing from the command line fall back to environment variables.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::data::default_db_path;
use crate::error::{Error, Result};
use crate::network::DEFAULT_API_URL;

/// Export a GameTrack library to CSV and Prometheus metrics.
#[derive(Parser, Debug)]
#[command(name = "gametrack-data")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub export: ExportArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export the GameTrack library (default)
    Export(ExportArgs),

    /// Generate metrics from a previously exported CSV
    Metrics(MetricsArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Output CSV filename
    #[arg(long, value_name = "FILENAME")]
    pub output_filename: Option<PathBuf>,

    /// Prometheus metrics filename
    #[arg(long, value_name = "FILENAME")]
    pub metrics_filename: Option<PathBuf>,

    /// GitHub repository to publish games.csv to [env: GITHUB_REPOSITORY]
    #[arg(long, value_name = "GITHUB_REPOSITORY")]
    pub gh_repo: Option<String>,

    /// GitHub token [env: GITHUB_TOKEN]
    #[arg(long, value_name = "GITHUB_TOKEN")]
    pub gh_token: Option<String>,

    /// Branch that receives the data commit
    #[arg(long, value_name = "BRANCH")]
    pub gh_branch: Option<String>,

    /// GitHub API base URL [env: GITHUB_API_URL]
    #[arg(long, value_name = "URL")]
    pub gh_api_url: Option<String>,

    /// Path to GameData.sqlite [env: GAMETRACK_DB]
    #[arg(long, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Read games from a remote API instead of the local database [env: GAMETRACK_API_URL]
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Bearer token for --api-url [env: GAMETRACK_API_TOKEN]
    #[arg(long, value_name = "TOKEN")]
    pub api_token: Option<String>,

    /// Don't look up Wikidata item ids
    #[arg(long)]
    pub skip_wikidata: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MetricsArgs {
    /// Input CSV filename
    #[arg(long, value_name = "FILENAME")]
    pub input_filename: PathBuf,

    /// Prometheus metrics filename, `-` for stdout
    #[arg(long, value_name = "FILENAME", default_value = "-")]
    pub metrics_filename: String,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Where games are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    Database(PathBuf),
    Api { url: String, token: Option<String> },
}

/// Where games.csv is published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubTarget {
    pub repo: String,
    pub token: String,
    pub branch: String,
    pub api_url: String,
}

/// Settings for one export run, resolved from CLI arguments and environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub source: SourceConfig,
    pub output_filename: Option<PathBuf>,
    pub metrics_filename: Option<PathBuf>,
    pub github: Option<GitHubTarget>,
    pub wikidata: bool,
}

impl ExportConfig {
    /// Resolve against the process environment
    pub fn from_args(args: ExportArgs) -> Result<Self> {
        Self::resolve(args, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup
    pub fn resolve(args: ExportArgs, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let source = match args.api_url.or_else(|| lookup("GAMETRACK_API_URL")) {
            Some(url) => SourceConfig::Api {
                url,
                token: args.api_token.or_else(|| lookup("GAMETRACK_API_TOKEN")),
            },
            None => SourceConfig::Database(
                args.db_path
                    .or_else(|| lookup("GAMETRACK_DB").map(PathBuf::from))
                    .unwrap_or_else(default_db_path),
            ),
        };

        let token = args.gh_token.or_else(|| lookup("GITHUB_TOKEN"));
        let github = match (args.gh_repo, token) {
            (Some(repo), Some(token)) => Some((repo, token)),
            (Some(repo), None) => {
                return Err(Error::auth(
                    "GitHub",
                    format!("no token for {repo}; pass --gh-token or set GITHUB_TOKEN"),
                ))
            }
            // A repository from the environment alone doesn't ask for an upload
            (None, token) => match (lookup("GITHUB_REPOSITORY"), token) {
                (Some(repo), Some(token)) => Some((repo, token)),
                (Some(repo), None) => {
                    debug!("GITHUB_REPOSITORY={repo} but no token, not publishing");
                    None
                }
                (None, _) => None,
            },
        };

        let github = github.map(|(repo, token)| GitHubTarget {
            repo,
            token,
            branch: args.gh_branch.unwrap_or_else(|| "data".to_string()),
            api_url: args
                .gh_api_url
                .or_else(|| lookup("GITHUB_API_URL"))
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        });

        Ok(ExportConfig {
            source,
            output_filename: args.output_filename,
            metrics_filename: args.metrics_filename,
            github,
            wikidata: !args.skip_wikidata,
        })
    }

    /// Whether the run would produce anything
    pub fn has_outputs(&self) -> bool {
        self.output_filename.is_some() || self.metrics_filename.is_some() || self.github.is_some()
    }
}
