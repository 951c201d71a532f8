//! RepositoryRouter - routes operations to RepositoryActors, spawning them
//! on demand.
//!
//! A thin map from repository name to actor handle. `DashMap` gives
//! lock-free concurrent access, and the entry API resolves the race where
//! two callers spawn the same repository at once.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::{sync::Semaphore, task::JoinHandle, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{domain::Repository, service::LifecycleManager};

use super::{
  handle::RepositoryHandle,
  message::{RepositoryCommand, RepositoryMessage},
  repository::RepositoryActor,
};

struct ActorSlot {
  handle: RepositoryHandle,
  join: JoinHandle<()>,
}

pub struct RepositoryRouter {
  /// Active repository actors, keyed by repository name.
  actors: DashMap<String, ActorSlot>,
  lifecycle: Arc<LifecycleManager>,
  /// Shared worker-pool bound, one permit per in-flight operation.
  permits: Arc<Semaphore>,
  /// Parent token; every spawned actor gets a child.
  cancel: CancellationToken,
}

impl RepositoryRouter {
  pub fn new(lifecycle: Arc<LifecycleManager>, pool_size: usize, cancel: CancellationToken) -> Self {
    Self {
      actors: DashMap::new(),
      lifecycle,
      permits: Arc::new(Semaphore::new(pool_size.max(1))),
      cancel,
    }
  }

  /// Get or spawn the actor for a repository.
  ///
  /// Idempotent: concurrent callers for the same repository end up with
  /// handles to the same actor.
  pub fn get_or_create(&self, repository: &Repository) -> RepositoryHandle {
    if let Some(slot) = self.actors.get(&repository.name) {
      return slot.handle.clone();
    }

    let (handle, join) = RepositoryActor::spawn(
      repository.clone(),
      self.lifecycle.clone(),
      self.permits.clone(),
      self.cancel.child_token(),
    );

    match self.actors.entry(repository.name.clone()) {
      dashmap::mapref::entry::Entry::Occupied(existing) => {
        // Another task won the race; our spare actor exits once its last
        // handle drops and the mailbox closes.
        warn!(repository = %repository.name, "Race on actor spawn, using existing RepositoryActor");
        drop(join);
        existing.get().handle.clone()
      }
      dashmap::mapref::entry::Entry::Vacant(vacant) => {
        info!(repository = %repository.name, "Spawned RepositoryActor");
        vacant.insert(ActorSlot {
          handle: handle.clone(),
          join,
        });
        handle
      }
    }
  }

  pub fn list(&self) -> Vec<String> {
    self.actors.iter().map(|entry| entry.key().clone()).collect()
  }

  /// Send shutdown to every active actor and wait for them to stop.
  ///
  /// The shutdown message queues behind work already in the mailbox, so
  /// queued and in-flight operations run to completion first. Each actor
  /// gets up to `wait` to drain before being aborted.
  pub async fn shutdown_all(&self, wait: Duration) {
    let names = self.list();
    if names.is_empty() {
      return;
    }

    info!(count = names.len(), "Shutting down all RepositoryActors");
    let shutdowns = names.into_iter().filter_map(|name| {
      self.actors.remove(&name).map(|(_, slot)| async move {
        let msg = RepositoryMessage {
          command: RepositoryCommand::Shutdown,
          reply: None,
        };
        if slot.handle.tx.send(msg).await.is_err() {
          debug!(repository = %name, "RepositoryActor already stopped");
        }

        let mut join = slot.join;
        if timeout(wait, &mut join).await.is_err() {
          warn!(repository = %name, "RepositoryActor did not stop in time, aborting");
          join.abort();
        }
      })
    });
    futures::future::join_all(shutdowns).await;
  }
}
