//! artidex CLI - artifact repository index maintenance

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;

use artidex::{IndexerSubsystem, JsonIndexStore, OperationReport, Repository};
use artidex_core::IndexerSettings;

mod logging;

const SHUTDOWN_WAIT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "artidex")]
#[command(about = "Maintain metadata indexes over artifact repositories")]
struct Cli {
  /// Configuration file
  #[arg(short, long, default_value = "artidex.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run an incremental index pass over one repository, or all of them
  Index {
    /// Repository name (omit for all locally backed repositories)
    repository: Option<String>,
    /// Restrict the pass to artifacts under this path prefix
    #[arg(short, long)]
    path: Option<String>,
    /// Purge first and rebuild the index from scratch
    #[arg(long)]
    rebuild: bool,
  },
  /// Remove index entries for one repository, or all of them
  Purge {
    /// Repository name (omit for all locally backed repositories)
    repository: Option<String>,
    /// Restrict the purge to artifacts under this path prefix
    #[arg(short, long)]
    path: Option<String>,
  },
  /// Run the scheduler with the configured recurring tasks until Ctrl-C
  Run,
}

/// Host configuration file: subsystem settings plus the repository list.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HostConfig {
  index: IndexerSettings,
  repositories: Vec<Repository>,
}

impl HostConfig {
  fn load(path: &PathBuf) -> Result<Self> {
    if !path.exists() {
      bail!("configuration file {} not found", path.display());
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  logging::init_logging();
  let cli = Cli::parse();
  let config = HostConfig::load(&cli.config)?;

  match cli.command {
    Commands::Index {
      repository,
      path,
      rebuild,
    } => cmd_index(config, repository, path.as_deref(), rebuild).await,
    Commands::Purge { repository, path } => cmd_purge(config, repository, path.as_deref()).await,
    Commands::Run => cmd_run(config).await,
  }
}

/// Build a subsystem for a one-shot command: invoking the command is the
/// on-switch, and no recurring tasks are registered.
fn one_shot_subsystem(mut config: HostConfig) -> (IndexerSubsystem, Vec<Repository>) {
  config.index.enabled = true;
  config.index.indexing_tasks.clear();
  let store = Arc::new(JsonIndexStore::new(&config.index.index_path));
  let repositories = config.repositories.clone();
  (
    IndexerSubsystem::start(config.index, config.repositories, store),
    repositories,
  )
}

fn find_repository(repositories: &[Repository], name: &str) -> Result<Repository> {
  repositories
    .iter()
    .find(|r| r.name == name)
    .cloned()
    .with_context(|| format!("repository '{name}' is not configured"))
}

fn print_report(report: &OperationReport) {
  println!(
    "{}: {} indexed {}, confirmed {}, removed {}, errors {} in {:.2?}",
    report.repository, report.operation, report.indexed, report.confirmed, report.removed, report.errors,
    report.duration
  );
}

async fn cmd_index(config: HostConfig, repository: Option<String>, path: Option<&str>, rebuild: bool) -> Result<()> {
  let (subsystem, repositories) = one_shot_subsystem(config);
  let facade = subsystem.facade();

  let result: Result<()> = async {
    match repository {
      Some(name) => {
        let repository = find_repository(&repositories, &name)?;
        let report = if rebuild {
          facade.rebuild_repository(&repository, path).await?
        } else {
          facade.index_repository(&repository, path).await?
        };
        print_report(&report);
      }
      None => {
        if rebuild {
          bail!("--rebuild requires a repository name");
        }
        for report in facade.index_all(path).await? {
          print_report(&report);
        }
      }
    }
    Ok(())
  }
  .await;

  subsystem.shutdown(SHUTDOWN_WAIT).await;
  result
}

async fn cmd_purge(config: HostConfig, repository: Option<String>, path: Option<&str>) -> Result<()> {
  let (subsystem, repositories) = one_shot_subsystem(config);
  let facade = subsystem.facade();

  let result: Result<()> = async {
    match repository {
      Some(name) => {
        let repository = find_repository(&repositories, &name)?;
        print_report(&facade.purge_repository(&repository, path).await?);
      }
      None => {
        for report in facade.purge_all(path).await? {
          print_report(&report);
        }
      }
    }
    Ok(())
  }
  .await;

  subsystem.shutdown(SHUTDOWN_WAIT).await;
  result
}

async fn cmd_run(config: HostConfig) -> Result<()> {
  if !config.index.enabled {
    bail!("indexing is disabled in the configuration; set index.enabled = true");
  }

  let store = Arc::new(JsonIndexStore::new(&config.index.index_path));
  let mut subsystem = IndexerSubsystem::start(config.index, config.repositories, store);

  // Surface failure reports on the console while running.
  if let Some(mut failures) = subsystem.take_failures() {
    tokio::spawn(async move {
      while let Some(report) = failures.recv().await {
        eprintln!("[{}] {} failed: {}", report.repository, report.operation, report.message);
      }
    });
  }

  info!("Running, press Ctrl-C to stop");
  tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;

  subsystem.shutdown(SHUTDOWN_WAIT).await;
  Ok(())
}
