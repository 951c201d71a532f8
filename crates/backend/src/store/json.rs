//! File-backed index store.
//!
//! One JSON document per repository under
//! `<index_root>/<repo>/search-index/index.json`. The whole document is the
//! commit unit: mutations accumulate in memory and `commit` writes a temp
//! file next to the live one and renames it into place, so readers never
//! observe a partially written index.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use artidex_core::IndexerSet;

use super::{ArtifactRecord, IndexContext, IndexStore, IndexSummary, PackSource, StoreError, StoredRecord};

const INDEX_FILE: &str = "index.json";
const SEARCH_DIR: &str = "search-index";

// ============================================================================
// On-disk document
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IndexDocument {
  generation: u64,
  summary: IndexSummary,
  rows: Vec<Row>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Row {
  id: u64,
  record: ArtifactRecord,
}

// ============================================================================
// Store
// ============================================================================

/// Default [`IndexStore`] implementation over plain JSON files.
#[derive(Debug, Clone)]
pub struct JsonIndexStore {
  index_root: PathBuf,
}

impl JsonIndexStore {
  pub fn new(index_root: impl Into<PathBuf>) -> Self {
    Self {
      index_root: index_root.into(),
    }
  }

  fn index_file(&self, repository: &str) -> PathBuf {
    self.index_root.join(repository).join(SEARCH_DIR).join(INDEX_FILE)
  }
}

#[async_trait]
impl IndexStore for JsonIndexStore {
  async fn open(&self, repository: &str, indexers: IndexerSet) -> Result<Box<dyn IndexContext>, StoreError> {
    let file = self.index_file(repository);
    if let Some(dir) = file.parent() {
      tokio::fs::create_dir_all(dir).await?;
    }

    let committed = match tokio::fs::read(&file).await {
      Ok(bytes) => serde_json::from_slice::<IndexDocument>(&bytes).map_err(|source| StoreError::Corrupt {
        path: file.display().to_string(),
        source,
      })?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => IndexDocument::default(),
      Err(e) => return Err(e.into()),
    };

    let next_row = committed.rows.iter().map(|r| r.id + 1).max().unwrap_or(1);
    let target_generation = committed.generation + 1;

    debug!(
      repository = %repository,
      rows = committed.rows.len(),
      generation = committed.generation,
      indexers = ?indexers.effective(),
      "Opened index context"
    );

    Ok(Box::new(JsonIndexContext {
      repository: repository.to_string(),
      file,
      working: committed.clone(),
      committed,
      next_row,
      target_generation,
      dirty: false,
    }))
  }
}

// ============================================================================
// Context
// ============================================================================

struct JsonIndexContext {
  repository: String,
  file: PathBuf,
  /// Last state persisted to disk.
  committed: IndexDocument,
  /// Live state including uncommitted mutations.
  working: IndexDocument,
  next_row: u64,
  /// All upserts through this context carry this generation.
  target_generation: u64,
  dirty: bool,
}

#[async_trait]
impl IndexContext for JsonIndexContext {
  fn repository(&self) -> &str {
    &self.repository
  }

  fn generation(&self) -> u64 {
    self.target_generation
  }

  async fn load_snapshot(&mut self, prefix: Option<&str>) -> Result<Vec<StoredRecord>, StoreError> {
    let prefix = prefix.unwrap_or("");
    Ok(
      self
        .committed
        .rows
        .iter()
        .filter(|r| r.record.path.starts_with(prefix))
        .map(|r| StoredRecord {
          row: r.id,
          record: r.record.clone(),
        })
        .collect(),
    )
  }

  async fn upsert(&mut self, mut record: ArtifactRecord) -> Result<(), StoreError> {
    let uinfo = record.identity.uinfo();
    self.working.rows.retain(|r| r.record.identity.uinfo() != uinfo);

    record.generation = self.target_generation;
    let id = self.next_row;
    self.next_row += 1;
    trace!(repository = %self.repository, uinfo = %uinfo, row = id, "Upserting record");

    self.working.rows.push(Row { id, record });
    self.dirty = true;
    Ok(())
  }

  async fn find_exact(&mut self, uinfo: &str) -> Result<Vec<StoredRecord>, StoreError> {
    Ok(
      self
        .working
        .rows
        .iter()
        .filter(|r| r.record.identity.uinfo() == uinfo)
        .map(|r| StoredRecord {
          row: r.id,
          record: r.record.clone(),
        })
        .collect(),
    )
  }

  async fn find_under(&mut self, prefix: &str) -> Result<Vec<StoredRecord>, StoreError> {
    Ok(
      self
        .working
        .rows
        .iter()
        .filter(|r| r.record.path.starts_with(prefix))
        .map(|r| StoredRecord {
          row: r.id,
          record: r.record.clone(),
        })
        .collect(),
    )
  }

  async fn delete_rows(&mut self, rows: &[u64]) -> Result<u64, StoreError> {
    let before = self.working.rows.len();
    self.working.rows.retain(|r| !rows.contains(&r.id));
    let removed = (before - self.working.rows.len()) as u64;
    if removed > 0 {
      self.dirty = true;
    }
    Ok(removed)
  }

  async fn write_summary(&mut self, summary: IndexSummary) -> Result<(), StoreError> {
    self.working.summary = summary;
    self.dirty = true;
    Ok(())
  }

  async fn commit(&mut self) -> Result<(), StoreError> {
    if !self.dirty {
      trace!(repository = %self.repository, "Commit skipped, nothing changed");
      return Ok(());
    }

    self.working.generation = self.target_generation;
    let bytes = serde_json::to_vec_pretty(&self.working).map_err(StoreError::Encode)?;

    // Temp file in the same directory so the rename stays on one filesystem.
    let tmp = self.file.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, &self.file).await?;

    self.committed = self.working.clone();
    self.dirty = false;

    debug!(
      repository = %self.repository,
      rows = self.committed.rows.len(),
      generation = self.committed.generation,
      "Committed index"
    );
    Ok(())
  }

  async fn read_snapshot(&mut self) -> Result<PackSource, StoreError> {
    Ok(PackSource {
      repository: self.repository.clone(),
      generation: self.committed.generation,
      summary: self.committed.summary.clone(),
      rows: self
        .committed
        .rows
        .iter()
        .map(|r| StoredRecord {
          row: r.id,
          record: r.record.clone(),
        })
        .collect(),
    })
  }

  async fn close(self: Box<Self>) -> Result<(), StoreError> {
    if self.dirty {
      debug!(repository = %self.repository, "Closing index context with uncommitted changes, discarding");
    }
    Ok(())
  }
}

// ============================================================================
// Tests
// ============================================================================
