//! Scheduler and facade behavior tests.

use std::time::Duration;

use pretty_assertions::assert_eq;

use artidex_core::{IndexInterval, IndexerSettings, IndexingTask};

use crate::service::ServiceError;

use super::helpers::ActorTestContext;

/// Poll until the repository's index holds `expected` paths or time out.
async fn wait_for_index(ctx: &ActorTestContext, repository: &str, expected: usize) -> Vec<String> {
  let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
  loop {
    let paths = ctx.indexed_paths(repository).await;
    if paths.len() == expected {
      return paths;
    }
    if tokio::time::Instant::now() > deadline {
      panic!("index never reached {expected} entries, last: {paths:?}");
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
  }
}

/// An enabled recurring task fires immediately at registration, not one
/// interval later.
#[tokio::test]
async fn recurring_task_fires_immediately() {
  let ctx = ActorTestContext::new(&["releases"]);
  ctx.seed("releases", "com/acme/a/1.0/a-1.0.jar");

  let settings = IndexerSettings {
    indexing_tasks: vec![IndexingTask {
      // Long interval: only the immediate first firing can index this.
      interval: IndexInterval::Daily,
      ..IndexingTask::default()
    }],
    ..ctx.settings(1)
  };
  let subsystem = ctx.subsystem(settings);

  let paths = wait_for_index(&ctx, "releases", 1).await;
  assert_eq!(paths, vec!["com/acme/a/1.0/a-1.0.jar".to_string()]);

  subsystem.shutdown(Duration::from_secs(5)).await;
}

/// Enabling a task through `apply_config` rebuilds the scheduler and the
/// new task fires.
#[tokio::test]
async fn apply_config_rebuilds_the_task_set() {
  let ctx = ActorTestContext::new(&["releases"]);
  ctx.seed("releases", "com/acme/a/1.0/a-1.0.jar");

  // Starts with no enabled tasks.
  let mut subsystem = ctx.subsystem(ctx.settings(1));
  tokio::time::sleep(Duration::from_millis(200)).await;
  assert!(ctx.indexed_paths("releases").await.is_empty());

  let new = IndexerSettings {
    indexing_tasks: vec![IndexingTask::default()],
    ..ctx.settings(1)
  };
  let diff = subsystem.apply_config(new);
  assert!(diff.task_set_changed);
  assert!(!diff.pool_size_changed);

  wait_for_index(&ctx, "releases", 1).await;
  subsystem.shutdown(Duration::from_secs(5)).await;
}

/// Disabling the subsystem makes facade calls fail with a typed error
/// before any work is queued.
#[tokio::test]
async fn disabled_subsystem_rejects_facade_calls() {
  let ctx = ActorTestContext::new(&["releases"]);
  let settings = IndexerSettings {
    enabled: false,
    ..ctx.settings(1)
  };
  let subsystem = ctx.subsystem(settings);
  let facade = subsystem.facade();

  let err = facade.index_repository(ctx.repository("releases"), None).await.unwrap_err();
  assert!(matches!(err, ServiceError::Disabled));
  let err = facade.purge_all(None).await.unwrap_err();
  assert!(matches!(err, ServiceError::Disabled));

  subsystem.shutdown(Duration::from_secs(5)).await;
}

/// Batch indexing stops at the first failing repository; repositories that
/// finished earlier keep their committed state, later ones are not run.
#[tokio::test]
async fn index_all_short_circuits_at_first_failure() {
  let ctx = ActorTestContext::with_store(&["alpha", "beta", "gamma"], |store| {
    store.fail_for = Some("beta".to_string());
  });
  ctx.seed("alpha", "com/acme/a/1.0/a-1.0.jar");
  ctx.seed("beta", "com/acme/b/1.0/b-1.0.jar");
  ctx.seed("gamma", "com/acme/c/1.0/c-1.0.jar");

  let subsystem = ctx.subsystem(ctx.settings(1));
  let facade = subsystem.facade();

  let err = facade.index_all(None).await.unwrap_err();
  assert!(matches!(err, ServiceError::Store(_)));

  assert_eq!(ctx.indexed_paths("alpha").await.len(), 1, "completed before the failure");
  assert!(
    !ctx.index_dir.path().join("gamma").join("search-index").join("index.json").exists(),
    "gamma must not have been attempted"
  );

  subsystem.shutdown(Duration::from_secs(5)).await;
}

/// The rebuild facade operation purges before it rescans.
#[tokio::test]
async fn rebuild_replaces_the_whole_index() {
  let ctx = ActorTestContext::new(&["releases"]);
  ctx.seed("releases", "com/acme/a/1.0/a-1.0.jar");

  let subsystem = ctx.subsystem(ctx.settings(1));
  let facade = subsystem.facade();
  let repository = ctx.repository("releases");

  facade.index_repository(repository, None).await.expect("first index");

  // The tree changes shape entirely; rebuild must reflect only the new state.
  std::fs::remove_file(ctx.storage.path().join("releases/com/acme/a/1.0/a-1.0.jar")).unwrap();
  ctx.seed("releases", "org/new/lib/2.0/lib-2.0.jar");

  let report = facade.rebuild_repository(repository, None).await.expect("rebuild");
  assert_eq!(report.indexed, 1);
  assert_eq!(ctx.indexed_paths("releases").await, vec![
    "org/new/lib/2.0/lib-2.0.jar".to_string()
  ]);

  subsystem.shutdown(Duration::from_secs(5)).await;
}
