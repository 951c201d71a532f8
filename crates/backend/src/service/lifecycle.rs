//! Index lifecycle manager.
//!
//! One full reconciliation pass is open → scan → reconcile → commit → pack
//! → close; purge is open → query → delete → commit → close. Whatever
//! happens in between, the context is closed before the operation returns,
//! and pack failures are reported instead of failing an already committed
//! pass.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::{Duration, Instant},
};

use tracing::{debug, info};

use artidex_core::{IndexerSet, IndexerSettings};

use crate::{
  domain::Repository,
  reconcile::{ReconcileOptions, ReconcilePass, ReconcileReport},
  scan::{self, DiscoveryEvent},
  store::{IndexContext, IndexStore, StoreError, pack},
};

use super::{FailureChannel, ServiceError};

const PACK_DIR: &str = "maven-index";

/// Which lifecycle operation produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Index,
  Rebuild,
  Purge,
}

impl std::fmt::Display for Operation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Operation::Index => "index",
      Operation::Rebuild => "rebuild",
      Operation::Purge => "purge",
    })
  }
}

/// Outcome of one lifecycle operation.
#[derive(Debug)]
pub struct OperationReport {
  pub repository: String,
  pub operation: Operation,
  pub indexed: u64,
  pub confirmed: u64,
  pub removed: u64,
  /// Per-artifact failures, already forwarded to the failure channel.
  pub errors: usize,
  pub duration: Duration,
}

/// Orchestrates lifecycle operations against the index store port.
///
/// The manager itself is stateless between operations; serialization per
/// repository is the caller's job (the repository actor).
pub struct LifecycleManager {
  store: Arc<dyn IndexStore>,
  failures: FailureChannel,
}

impl LifecycleManager {
  pub fn new(store: Arc<dyn IndexStore>, failures: FailureChannel) -> Self {
    Self { store, failures }
  }

  pub fn failures(&self) -> &FailureChannel {
    &self.failures
  }

  /// Scan the repository tree and reconcile the index against it, then
  /// pack the committed result.
  pub async fn incremental_index(
    &self,
    settings: &IndexerSettings,
    repository: &Repository,
    prefix: Option<&str>,
    indexers: IndexerSet,
    continuous: bool,
  ) -> Result<OperationReport, ServiceError> {
    let root = local_root(repository)?;
    let started = Instant::now();

    let mut ctx = self.store.open(&repository.name, indexers.effective()).await?;
    let result = self.run_scan(ctx.as_mut(), &root, prefix, indexers, continuous).await;

    // Packing works off the committed state, so it only makes sense after
    // a successful pass. Its failure is reported, not raised: the index
    // itself is already consistent.
    if result.is_ok() {
      self.pack_index(ctx.as_mut(), settings, &repository.name).await;
    }

    // The context is released on every path before errors propagate.
    let close_result = ctx.close().await;

    let report = result?;
    if let Err(e) = close_result {
      self.failures.report(&repository.name, "close", e);
    }
    for failure in &report.errors {
      self.failures.report(&repository.name, "scan", failure);
    }

    let duration = started.elapsed();
    info!(repository = %repository.name, elapsed = ?duration, "Indexed the {} repository in {:?}", repository.name, duration);

    Ok(OperationReport {
      repository: repository.name.clone(),
      operation: Operation::Index,
      indexed: report.indexed,
      confirmed: report.confirmed,
      removed: report.removed,
      errors: report.errors.len(),
      duration,
    })
  }

  /// Purge, then reindex from scratch. The purge commit completes before
  /// the scan begins.
  pub async fn rebuild_index(
    &self,
    settings: &IndexerSettings,
    repository: &Repository,
    prefix: Option<&str>,
    indexers: IndexerSet,
  ) -> Result<OperationReport, ServiceError> {
    let started = Instant::now();
    let purged = self.purge_index(repository, prefix).await?;
    let mut report = self.incremental_index(settings, repository, prefix, indexers, false).await?;

    report.operation = Operation::Rebuild;
    report.removed += purged.removed;
    report.duration = started.elapsed();
    Ok(report)
  }

  /// Delete every record under the prefix. No scan is performed.
  pub async fn purge_index(&self, repository: &Repository, prefix: Option<&str>) -> Result<OperationReport, ServiceError> {
    local_root(repository)?;
    let started = Instant::now();

    let mut ctx = self.store.open(&repository.name, IndexerSet::none()).await?;
    let result = purge(ctx.as_mut(), prefix).await;
    let close_result = ctx.close().await;

    let removed = result?;
    if let Err(e) = close_result {
      self.failures.report(&repository.name, "close", e);
    }

    let duration = started.elapsed();
    info!(
      repository = %repository.name,
      removed = removed,
      elapsed = ?duration,
      "Purged the {} repository index in {:?}", repository.name, duration
    );

    Ok(OperationReport {
      repository: repository.name.clone(),
      operation: Operation::Purge,
      indexed: 0,
      confirmed: 0,
      removed,
      errors: 0,
      duration,
    })
  }

  async fn run_scan(
    &self,
    ctx: &mut dyn IndexContext,
    root: &Path,
    prefix: Option<&str>,
    indexers: IndexerSet,
    continuous: bool,
  ) -> Result<ReconcileReport, StoreError> {
    let options = ReconcileOptions {
      prefix: prefix.map(str::to_string),
      continuous,
    };
    let mut pass = ReconcilePass::begin(ctx, options).await?;

    let mut events = scan::scan(root.to_path_buf(), prefix.map(str::to_string), indexers);
    while let Some(event) = events.recv().await {
      match event {
        DiscoveryEvent::Discovered(record) => pass.artifact_discovered(ctx, record).await?,
        DiscoveryEvent::Failed(failure) => pass.artifact_error(failure),
      }
    }

    pass.finish(ctx).await
  }

  async fn pack_index(&self, ctx: &mut dyn IndexContext, settings: &IndexerSettings, repository: &str) {
    let source = match ctx.read_snapshot().await {
      Ok(source) => source,
      Err(e) => {
        self.failures.report(repository, "pack", e);
        return;
      }
    };

    let dest = Path::new(&settings.index_path).join(repository).join(PACK_DIR);
    let pack_settings = pack::PackSettings {
      incremental_chunks: settings.incremental_chunks,
      incremental_chunks_count: settings.chunk_count(),
      create_checksum_files: settings.create_checksum_files,
    };

    match pack::pack(&source, &dest, &pack_settings) {
      Ok(report) => debug!(
        repository = %repository,
        records = report.records,
        chunks = report.chunks_written,
        "Export complete"
      ),
      Err(e) => self.failures.report(repository, "pack", e),
    }
  }
}

async fn purge(ctx: &mut dyn IndexContext, prefix: Option<&str>) -> Result<u64, StoreError> {
  let rows = ctx.find_under(prefix.unwrap_or("")).await?;
  let mut identities = std::collections::BTreeSet::new();
  let ids: Vec<u64> = rows
    .iter()
    .map(|r| {
      identities.insert(r.record.identity.uinfo());
      r.row
    })
    .collect();

  if !ids.is_empty() {
    ctx.delete_rows(&ids).await?;
    ctx.commit().await?;
  }
  Ok(identities.len() as u64)
}

fn local_root(repository: &Repository) -> Result<PathBuf, ServiceError> {
  repository
    .local_root()
    .map(Path::to_path_buf)
    .ok_or_else(|| ServiceError::NotLocal(repository.name.clone()))
}

// ============================================================================
// Tests
// ============================================================================
