//! Serialization and pool-bound tests.

use std::time::Duration;

use pretty_assertions::assert_eq;

use super::helpers::ActorTestContext;

/// Concurrent operations against one repository never hold two open index
/// contexts at once; they queue behind each other in arrival order.
#[tokio::test]
async fn same_repository_operations_are_serialized() {
  let ctx = ActorTestContext::with_store(&["releases"], |store| {
    store.open_delay = Some(Duration::from_millis(25));
  });
  ctx.seed("releases", "com/acme/a/1.0/a-1.0.jar");

  let subsystem = ctx.subsystem(ctx.settings(4));
  let facade = subsystem.facade();
  let repository = ctx.repository("releases").clone();

  let mut handles = Vec::new();
  for _ in 0..5 {
    let facade = facade.clone();
    let repository = repository.clone();
    handles.push(tokio::spawn(
      async move { facade.index_repository(&repository, None).await },
    ));
  }
  for handle in handles {
    handle.await.expect("join").expect("index should succeed");
  }

  assert_eq!(
    ctx.store.max_for("releases"),
    1,
    "two passes over one repository must never overlap"
  );

  subsystem.shutdown(Duration::from_secs(5)).await;
}

/// With two pool permits, passes over different repositories overlap.
#[tokio::test]
async fn different_repositories_overlap_up_to_the_pool_size() {
  let ctx = ActorTestContext::with_store(&["releases", "snapshots"], |store| {
    store.open_delay = Some(Duration::from_millis(100));
  });
  ctx.seed("releases", "com/acme/a/1.0/a-1.0.jar");
  ctx.seed("snapshots", "com/acme/b/1.0/b-1.0.jar");

  let subsystem = ctx.subsystem(ctx.settings(2));
  let facade = subsystem.facade();

  let (a, b) = tokio::join!(
    facade.index_repository(ctx.repository("releases"), None),
    facade.index_repository(ctx.repository("snapshots"), None),
  );
  a.expect("releases pass");
  b.expect("snapshots pass");

  assert_eq!(
    ctx.store.max_global.load(std::sync::atomic::Ordering::SeqCst),
    2,
    "both repositories should have been open at the same time"
  );

  subsystem.shutdown(Duration::from_secs(5)).await;
}

/// With a single permit the pool serializes even across repositories.
#[tokio::test]
async fn pool_of_one_serializes_across_repositories() {
  let ctx = ActorTestContext::with_store(&["releases", "snapshots"], |store| {
    store.open_delay = Some(Duration::from_millis(25));
  });
  ctx.seed("releases", "com/acme/a/1.0/a-1.0.jar");
  ctx.seed("snapshots", "com/acme/b/1.0/b-1.0.jar");

  let subsystem = ctx.subsystem(ctx.settings(1));
  let facade = subsystem.facade();

  let (a, b) = tokio::join!(
    facade.index_repository(ctx.repository("releases"), None),
    facade.index_repository(ctx.repository("snapshots"), None),
  );
  a.expect("releases pass");
  b.expect("snapshots pass");

  assert_eq!(ctx.store.max_global.load(std::sync::atomic::Ordering::SeqCst), 1);

  subsystem.shutdown(Duration::from_secs(5)).await;
}

/// Shutdown returns only after the in-flight pass has committed; the host
/// process exiting right afterwards can no longer interrupt it.
#[tokio::test]
async fn shutdown_waits_for_the_inflight_pass() {
  let ctx = ActorTestContext::with_store(&["releases"], |store| {
    store.open_delay = Some(Duration::from_millis(300));
  });
  ctx.seed("releases", "com/acme/a/1.0/a-1.0.jar");

  let subsystem = ctx.subsystem(ctx.settings(1));
  let facade = subsystem.facade();
  let repository = ctx.repository("releases").clone();

  let pass = tokio::spawn(async move { facade.index_repository(&repository, None).await });
  // Let the pass get past validation and into the store open delay.
  tokio::time::sleep(Duration::from_millis(50)).await;

  subsystem.shutdown(Duration::from_secs(5)).await;

  assert_eq!(
    ctx.indexed_paths("releases").await,
    vec!["com/acme/a/1.0/a-1.0.jar".to_string()],
    "the pass must have committed before shutdown returned"
  );
  pass.await.expect("join").expect("in-flight pass completes");
}

/// A queued second call sees the state the first call committed.
#[tokio::test]
async fn queued_operations_run_in_arrival_order() {
  let ctx = ActorTestContext::new(&["releases"]);
  ctx.seed("releases", "com/acme/a/1.0/a-1.0.jar");

  let subsystem = ctx.subsystem(ctx.settings(1));
  let facade = subsystem.facade();
  let repository = ctx.repository("releases");

  // Index, then purge, issued back to back: the purge must see and remove
  // what the index pass wrote.
  let (indexed, purged) = tokio::join!(
    facade.index_repository(repository, None),
    facade.purge_repository(repository, None),
  );
  assert_eq!(indexed.expect("index").indexed, 1);
  assert_eq!(purged.expect("purge").removed, 1);
  assert!(ctx.indexed_paths("releases").await.is_empty());

  subsystem.shutdown(Duration::from_secs(5)).await;
}
