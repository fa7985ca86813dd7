//! Export pipeline: fetch, enrich, then write each requested output.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::cli::{Cli, Commands, ExportConfig, MetricsArgs, SourceConfig};
use crate::data::{fetch_all, Game, GameSource, GameTrackDb, PAGE_SIZE};
use crate::error::Error;
use crate::export::{
    games_to_string, read_games_file, write_games_file, write_metrics, MetricsSnapshot,
};
use crate::network::{ApiSource, BranchHead, GitHubClient, PublishOutcome, WikidataClient};

/// Path of the CSV inside the published branch
const PUBLISHED_CSV: &str = "games.csv";
const COMMIT_MESSAGE: &str = "Update data";

/// What an export run produced
#[derive(Debug, Default)]
pub struct ExportReport {
    pub games: usize,
    pub rows_written: Option<usize>,
    pub metrics_written: Option<usize>,
    pub published: Option<PublishOutcome>,
}

impl ExportReport {
    fn summary(&self) -> String {
        let mut parts = vec![format!("{} games", self.games)];
        if let Some(rows) = self.rows_written {
            parts.push(format!("{rows} CSV rows"));
        }
        if let Some(samples) = self.metrics_written {
            parts.push(format!("{samples} metric samples"));
        }
        match &self.published {
            Some(PublishOutcome::Committed { commit_sha }) => {
                parts.push(format!("published {commit_sha}"))
            }
            Some(PublishOutcome::Unchanged { commit_sha }) => {
                parts.push(format!("branch unchanged at {commit_sha}"))
            }
            None => {}
        }
        format!("Export finished: {}", parts.join(", "))
    }
}

/// GitHub client plus the branch state it will commit on top of
struct Publisher {
    client: GitHubClient,
    branch: String,
    head: BranchHead,
}

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let args = match cli.command {
        Some(Commands::Metrics(args)) => {
            run_metrics(&args)?;
            return Ok(());
        }
        Some(Commands::Export(args)) => args,
        None => cli.export,
    };

    let config = ExportConfig::from_args(args)?;
    let report = run_export(&config)?;
    info!("{}", report.summary());
    Ok(())
}

/// Run a full export with the given settings
pub fn run_export(config: &ExportConfig) -> Result<ExportReport> {
    if !config.has_outputs() {
        return Err(Error::NothingToDo.into());
    }

    // A rejected token must fail the run before any local file is written
    let publisher = match &config.github {
        Some(target) => {
            let client = GitHubClient::new(&target.api_url, &target.repo, &target.token)?;
            let head = client
                .branch_head(&target.branch)
                .with_context(|| format!("Failed to resolve {}/{}", target.repo, target.branch))?;
            Some(Publisher {
                client,
                branch: target.branch.clone(),
                head,
            })
        }
        None => None,
    };

    let source = open_source(&config.source)?;
    let mut games = fetch_all(source.as_ref(), PAGE_SIZE)
        .with_context(|| format!("Failed to load games from {}", source.describe()))?;
    info!("Loaded {} games from {}", games.len(), source.describe());

    if config.wikidata {
        WikidataClient::new()
            .enrich(&mut games)
            .context("Failed to look up Wikidata items")?;
    }

    export_games(&games, config, publisher.as_ref(), Utc::now())
}

fn open_source(source: &SourceConfig) -> Result<Box<dyn GameSource>> {
    let source: Box<dyn GameSource> = match source {
        SourceConfig::Database(path) => Box::new(
            GameTrackDb::open(path)
                .with_context(|| format!("Failed to open database: {}", path.display()))?,
        ),
        SourceConfig::Api { url, token } => Box::new(ApiSource::new(url.clone(), token.clone())?),
    };
    Ok(source)
}

/// Write every configured output for an already-fetched library
fn export_games(
    games: &[Game],
    config: &ExportConfig,
    publisher: Option<&Publisher>,
    generated_at: DateTime<Utc>,
) -> Result<ExportReport> {
    let mut report = ExportReport {
        games: games.len(),
        ..ExportReport::default()
    };

    if let Some(path) = &config.output_filename {
        let count = write_games_file(path, games)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} rows to {}", count, path.display());
        report.rows_written = Some(count);
    }

    if let Some(path) = &config.metrics_filename {
        let snapshot = MetricsSnapshot::from_games(games, generated_at);
        let count = write_metrics_to(path, &snapshot)?;
        report.metrics_written = Some(count);
    }

    if let Some(publisher) = publisher {
        let (content, rows) = games_to_string(games)?;
        info!("Uploading {} games", rows);
        let outcome = publisher
            .client
            .commit_files(
                &publisher.head,
                &publisher.branch,
                COMMIT_MESSAGE,
                &[(PUBLISHED_CSV, content.as_str())],
            )
            .with_context(|| format!("Failed to publish to {}", publisher.client.repo()))?;
        report.published = Some(outcome);
    }

    Ok(report)
}

/// Regenerate metrics from an exported CSV
pub fn run_metrics(args: &MetricsArgs) -> Result<usize> {
    let games = read_games_file(&args.input_filename)
        .with_context(|| format!("Failed to read {}", args.input_filename.display()))?;
    let snapshot = MetricsSnapshot::from_games(&games, Utc::now());
    write_metrics_to(Path::new(&args.metrics_filename), &snapshot)
}

/// `-` writes to stdout
fn write_metrics_to(path: &Path, snapshot: &MetricsSnapshot) -> Result<usize> {
    if path == Path::new("-") {
        return Ok(write_metrics(io::stdout().lock(), snapshot)?);
    }

    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let count = write_metrics(BufWriter::new(file), snapshot)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {} metrics to {}", count, path.display());
    Ok(count)
}
