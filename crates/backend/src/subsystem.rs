//! Subsystem lifecycle.
//!
//! The owning process constructs the subsystem once, hands configuration
//! changes to `apply_config`, and calls `shutdown` on host shutdown. The
//! worker-pool size is fixed for the subsystem's lifetime; a pool-size
//! change is reported in the diff and takes effect on the next start.

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use artidex_core::{ConfigDiff, IndexerSettings};

use crate::{
  actor::{RepositoryRouter, Scheduler},
  domain::Repository,
  facade::IndexFacade,
  service::{FailureChannel, FailureReport, LifecycleManager},
  store::IndexStore,
};

// ============================================================================
// Settings cell
// ============================================================================

/// Shared, replaceable view of the current settings.
///
/// Operations snapshot the `Arc` when they are enqueued; replacing the
/// settings never mutates work already accepted.
#[derive(Clone)]
pub struct SettingsCell {
  inner: Arc<std::sync::RwLock<Arc<IndexerSettings>>>,
}

impl SettingsCell {
  fn new(settings: IndexerSettings) -> Self {
    Self {
      inner: Arc::new(std::sync::RwLock::new(Arc::new(settings))),
    }
  }

  pub fn current(&self) -> Arc<IndexerSettings> {
    match self.inner.read() {
      Ok(guard) => guard.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }

  fn replace(&self, settings: Arc<IndexerSettings>) {
    match self.inner.write() {
      Ok(mut guard) => *guard = settings,
      Err(poisoned) => *poisoned.into_inner() = settings,
    }
  }
}

// ============================================================================
// Subsystem
// ============================================================================

pub struct IndexerSubsystem {
  settings: SettingsCell,
  repositories: Arc<Vec<Repository>>,
  router: Arc<RepositoryRouter>,
  scheduler: Scheduler,
  cancel: CancellationToken,
  failures_rx: Option<mpsc::UnboundedReceiver<FailureReport>>,
}

impl IndexerSubsystem {
  /// Build the router and scheduler and register the configured recurring
  /// tasks. Recurring tasks start firing immediately when enabled.
  pub fn start(settings: IndexerSettings, repositories: Vec<Repository>, store: Arc<dyn IndexStore>) -> Self {
    let cancel = CancellationToken::new();
    let (failures, failures_rx) = FailureChannel::new();

    let lifecycle = Arc::new(LifecycleManager::new(store, failures.clone()));
    let router = Arc::new(RepositoryRouter::new(
      lifecycle,
      settings.pool_size(),
      cancel.child_token(),
    ));
    let mut scheduler = Scheduler::new(router.clone(), failures, cancel.child_token());

    let settings = SettingsCell::new(settings);
    let repositories = Arc::new(repositories);
    scheduler.rebuild(&settings.current(), &repositories);

    info!(
      repositories = repositories.len(),
      pool_size = settings.current().pool_size(),
      "Indexer subsystem started"
    );

    Self {
      settings,
      repositories,
      router,
      scheduler,
      cancel,
      failures_rx: Some(failures_rx),
    }
  }

  /// The imperative boundary for callers. Cheap to clone and hand out.
  pub fn facade(&self) -> IndexFacade {
    IndexFacade::new(self.router.clone(), self.repositories.clone(), self.settings.clone())
  }

  /// Take the failure-report stream. `None` after the first call; every
  /// report is also logged, so leaving it untaken is fine.
  pub fn take_failures(&mut self) -> Option<mpsc::UnboundedReceiver<FailureReport>> {
    self.failures_rx.take()
  }

  /// Swap in new settings and react to what changed: a changed task set
  /// rebuilds the scheduler, a changed pool size is reported but only
  /// takes effect on restart.
  pub fn apply_config(&mut self, new: IndexerSettings) -> ConfigDiff {
    let diff = self.settings.current().diff(&new);
    self.settings.replace(Arc::new(new));

    if diff.pool_size_changed {
      warn!("max_parallel_index_repositories changed, takes effect after restart");
    }
    if diff.task_set_changed {
      info!("Indexing task set changed, rebuilding scheduler");
      self.scheduler.rebuild(&self.settings.current(), &self.repositories);
    }
    diff
  }

  /// Cancel scheduled work and stop all actors, waiting up to `wait` for
  /// the recurring tasks and then for each actor to exit before aborting
  /// them. In-flight passes run to completion inside their actors, and
  /// shutdown does not return until they have.
  pub async fn shutdown(mut self, wait: Duration) {
    info!("Indexer subsystem shutting down");
    self.scheduler.shutdown(wait).await;
    self.router.shutdown_all(wait).await;
    self.cancel.cancel();
    info!("Indexer subsystem stopped");
  }
}
