//! Test helpers for actor integration tests.
//!
//! Provides `ActorTestContext`, which manages temporary storage and index
//! directories and wraps the store in a counting decorator so tests can
//! observe how many contexts are open per repository at once.

use std::{
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use async_trait::async_trait;
use dashmap::DashMap;
use tempfile::TempDir;

use artidex_core::{IndexerSet, IndexerSettings, IndexingTask};

use crate::{
  domain::Repository,
  store::{
    ArtifactRecord, IndexContext, IndexStore, IndexSummary, JsonIndexStore, PackSource, StoreError, StoredRecord,
  },
  subsystem::IndexerSubsystem,
};

// ============================================================================
// Counting store decorator
// ============================================================================

/// Wraps a [`JsonIndexStore`] and counts concurrently open contexts, both
/// per repository and globally. Optionally injects an open failure for one
/// repository and an artificial open delay to widen race windows.
pub struct CountingStore {
  inner: JsonIndexStore,
  open: DashMap<String, Arc<AtomicUsize>>,
  pub max_per_repo: DashMap<String, usize>,
  global_open: Arc<AtomicUsize>,
  pub max_global: Arc<AtomicUsize>,
  pub fail_for: Option<String>,
  pub open_delay: Option<Duration>,
}

impl CountingStore {
  pub fn new(index_root: &std::path::Path) -> Self {
    Self {
      inner: JsonIndexStore::new(index_root),
      open: DashMap::new(),
      max_per_repo: DashMap::new(),
      global_open: Arc::new(AtomicUsize::new(0)),
      max_global: Arc::new(AtomicUsize::new(0)),
      fail_for: None,
      open_delay: None,
    }
  }

  pub fn max_for(&self, repository: &str) -> usize {
    self.max_per_repo.get(repository).map(|v| *v.value()).unwrap_or(0)
  }
}

#[async_trait]
impl IndexStore for CountingStore {
  async fn open(&self, repository: &str, indexers: IndexerSet) -> Result<Box<dyn IndexContext>, StoreError> {
    if self.fail_for.as_deref() == Some(repository) {
      return Err(StoreError::Io(std::io::Error::other("injected open failure")));
    }

    let counter = self
      .open
      .entry(repository.to_string())
      .or_insert_with(|| Arc::new(AtomicUsize::new(0)))
      .clone();
    let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
    self
      .max_per_repo
      .entry(repository.to_string())
      .and_modify(|m| *m = (*m).max(now))
      .or_insert(now);

    let global_now = self.global_open.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_global.fetch_max(global_now, Ordering::SeqCst);

    if let Some(delay) = self.open_delay {
      tokio::time::sleep(delay).await;
    }

    let inner = match self.inner.open(repository, indexers).await {
      Ok(ctx) => ctx,
      Err(e) => {
        counter.fetch_sub(1, Ordering::SeqCst);
        self.global_open.fetch_sub(1, Ordering::SeqCst);
        return Err(e);
      }
    };

    Ok(Box::new(CountingContext {
      inner,
      counter,
      global: self.global_open.clone(),
    }))
  }
}

struct CountingContext {
  inner: Box<dyn IndexContext>,
  counter: Arc<AtomicUsize>,
  global: Arc<AtomicUsize>,
}

#[async_trait]
impl IndexContext for CountingContext {
  fn repository(&self) -> &str {
    self.inner.repository()
  }

  fn generation(&self) -> u64 {
    self.inner.generation()
  }

  async fn load_snapshot(&mut self, prefix: Option<&str>) -> Result<Vec<StoredRecord>, StoreError> {
    self.inner.load_snapshot(prefix).await
  }

  async fn upsert(&mut self, record: ArtifactRecord) -> Result<(), StoreError> {
    self.inner.upsert(record).await
  }

  async fn find_exact(&mut self, uinfo: &str) -> Result<Vec<StoredRecord>, StoreError> {
    self.inner.find_exact(uinfo).await
  }

  async fn find_under(&mut self, prefix: &str) -> Result<Vec<StoredRecord>, StoreError> {
    self.inner.find_under(prefix).await
  }

  async fn delete_rows(&mut self, rows: &[u64]) -> Result<u64, StoreError> {
    self.inner.delete_rows(rows).await
  }

  async fn write_summary(&mut self, summary: IndexSummary) -> Result<(), StoreError> {
    self.inner.write_summary(summary).await
  }

  async fn commit(&mut self) -> Result<(), StoreError> {
    self.inner.commit().await
  }

  async fn read_snapshot(&mut self) -> Result<PackSource, StoreError> {
    self.inner.read_snapshot().await
  }

  async fn close(self: Box<Self>) -> Result<(), StoreError> {
    let this = *self;
    this.counter.fetch_sub(1, Ordering::SeqCst);
    this.global.fetch_sub(1, Ordering::SeqCst);
    this.inner.close().await
  }
}

// ============================================================================
// Test context
// ============================================================================

pub struct ActorTestContext {
  pub storage: TempDir,
  pub index_dir: TempDir,
  pub store: Arc<CountingStore>,
  pub repositories: Vec<Repository>,
}

impl ActorTestContext {
  /// One context with the named repositories, each backed by its own
  /// subdirectory of the storage temp dir.
  pub fn new(names: &[&str]) -> Self {
    Self::with_store(names, |_| {})
  }

  /// Like [`ActorTestContext::new`], with a hook to configure the counting
  /// store (failure injection, open delay) before it is shared.
  pub fn with_store(names: &[&str], configure: impl FnOnce(&mut CountingStore)) -> Self {
    let storage = TempDir::new().expect("create storage temp dir");
    let index_dir = TempDir::new().expect("create index temp dir");

    let repositories = names
      .iter()
      .map(|name| {
        let root = storage.path().join(name);
        std::fs::create_dir_all(&root).expect("create repository root");
        Repository::local(*name, root)
      })
      .collect();

    let mut store = CountingStore::new(index_dir.path());
    configure(&mut store);

    Self {
      store: Arc::new(store),
      storage,
      index_dir,
      repositories,
    }
  }

  pub fn settings(&self, pool_size: usize) -> IndexerSettings {
    IndexerSettings {
      enabled: true,
      index_path: self.index_dir.path().display().to_string(),
      max_parallel_index_repositories: pool_size,
      indexing_tasks: vec![IndexingTask {
        enabled: false,
        ..IndexingTask::default()
      }],
      ..IndexerSettings::default()
    }
  }

  pub fn subsystem(&self, settings: IndexerSettings) -> IndexerSubsystem {
    IndexerSubsystem::start(settings, self.repositories.clone(), self.store.clone())
  }

  pub fn repository(&self, name: &str) -> &Repository {
    self
      .repositories
      .iter()
      .find(|r| r.name == name)
      .expect("unknown test repository")
  }

  /// Write an artifact file into a repository's storage tree.
  pub fn seed(&self, repository: &str, rel: &str) {
    let path = self.storage.path().join(repository).join(rel);
    std::fs::create_dir_all(path.parent().expect("artifact parent")).expect("create artifact dirs");
    std::fs::write(path, b"artifact bytes").expect("write artifact");
  }

  /// Paths currently committed in a repository's index, sorted.
  pub async fn indexed_paths(&self, repository: &str) -> Vec<String> {
    let mut ctx = self
      .store
      .open(repository, IndexerSet::none())
      .await
      .expect("open for inspection");
    let mut paths: Vec<String> = ctx
      .find_under("")
      .await
      .expect("query")
      .into_iter()
      .map(|r| r.record.path)
      .collect();
    ctx.close().await.expect("close inspection context");
    paths.sort();
    paths
  }
}
