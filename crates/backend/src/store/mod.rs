//! Index store port.
//!
//! The store is an opaque handle over one repository's metadata index. The
//! reconciliation engine only ever talks to it through the [`IndexStore`] and
//! [`IndexContext`] traits, so the backing engine can be swapped without
//! touching the engine. The default implementation is the file-backed
//! [`JsonIndexStore`], which commits by writing a temp file and renaming it
//! over the live one: a concurrent reader sees either the pre-commit or the
//! post-commit file, never a half-written one.

mod json;
pub mod pack;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use artidex_core::{ArtifactIdentity, IndexerSet};

pub use json::JsonIndexStore;
pub use pack::{PackReport, PackSettings};

// ============================================================================
// Records
// ============================================================================

/// One index entry for an artifact identity.
///
/// Which optional fields are populated depends on the indexer set the
/// context was opened with. `generation` is stamped by the store on upsert;
/// callers leave it zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
  pub identity: ArtifactIdentity,
  /// Repository-relative path with `/` separators.
  pub path: String,
  pub size: u64,
  /// Modification time, unix seconds.
  pub modified: i64,
  pub packaging: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sha256: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sha512: Option<String>,
  #[serde(default)]
  pub generation: u64,
}

/// A record together with its store row id.
///
/// Row ids make duplicate entries for one uinfo addressable individually,
/// which stale removal relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
  pub row: u64,
  pub record: ArtifactRecord,
}

/// Aggregate metadata written at the end of a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
  pub root_groups: BTreeSet<String>,
  pub all_groups: BTreeSet<String>,
}

/// A read-only view of the committed index, used for packing.
///
/// Acquired after the final commit of a pass and dropped as soon as packing
/// finishes, independent of pack success.
#[derive(Debug, Clone)]
pub struct PackSource {
  pub repository: String,
  pub generation: u64,
  pub summary: IndexSummary,
  pub rows: Vec<StoredRecord>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("index io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("corrupt index file {path}: {source}")]
  Corrupt {
    path: String,
    #[source]
    source: serde_json::Error,
  },
  #[error("failed to encode index file: {0}")]
  Encode(#[source] serde_json::Error),
}

// ============================================================================
// Port traits
// ============================================================================

/// Factory for per-repository index contexts.
#[async_trait]
pub trait IndexStore: Send + Sync {
  /// Open an exclusive writer context over one repository's index.
  ///
  /// Callers must uphold one-writer-per-repository; the store does not
  /// enforce cross-context locking itself.
  async fn open(&self, repository: &str, indexers: IndexerSet) -> Result<Box<dyn IndexContext>, StoreError>;
}

/// An open handle over one repository's index.
///
/// Mutations accumulate in the context and become visible to readers only
/// at `commit`. The handle must be closed on every exit path.
#[async_trait]
pub trait IndexContext: Send {
  fn repository(&self) -> &str;

  /// The generation upserts through this context will carry.
  fn generation(&self) -> u64;

  /// Load the committed records whose path starts with `prefix` (all
  /// records when `None`). This is the pending set for a pass.
  async fn load_snapshot(&mut self, prefix: Option<&str>) -> Result<Vec<StoredRecord>, StoreError>;

  /// Insert or replace the record for its identity. Existing rows with the
  /// same uinfo are replaced, so a completed upsert leaves exactly one row
  /// for that identity.
  async fn upsert(&mut self, record: ArtifactRecord) -> Result<(), StoreError>;

  /// All live rows whose identity renders to exactly `uinfo`.
  async fn find_exact(&mut self, uinfo: &str) -> Result<Vec<StoredRecord>, StoreError>;

  /// All live rows whose path starts with `prefix`.
  async fn find_under(&mut self, prefix: &str) -> Result<Vec<StoredRecord>, StoreError>;

  /// Delete rows by id, returning how many were actually removed.
  async fn delete_rows(&mut self, rows: &[u64]) -> Result<u64, StoreError>;

  async fn write_summary(&mut self, summary: IndexSummary) -> Result<(), StoreError>;

  /// Persist accumulated mutations. No-op when nothing changed.
  async fn commit(&mut self) -> Result<(), StoreError>;

  /// Snapshot the committed state for packing.
  async fn read_snapshot(&mut self) -> Result<PackSource, StoreError>;

  /// Release the handle. Uncommitted mutations are discarded.
  async fn close(self: Box<Self>) -> Result<(), StoreError>;
}
