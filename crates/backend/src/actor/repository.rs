//! RepositoryActor - owns all index operations for one repository.
//!
//! The actor processes its mailbox strictly in order, which is what makes
//! the mailbox the repository's exclusion slot: SCANNING/FINALIZING phases
//! of two passes can never interleave for one repository. Before running an
//! operation the actor takes a permit from the shared pool semaphore, so at
//! most `max_parallel_index_repositories` repositories are active at once.
//!
//! Cancellation is only checked between messages; an operation that has
//! started always runs to completion, including its commits and context
//! close.

use std::sync::Arc;

use tokio::{
  sync::{Semaphore, mpsc},
  task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
  domain::Repository,
  service::{LifecycleManager, OperationReport, ServiceError},
};

use super::{
  handle::RepositoryHandle,
  message::{RepositoryCommand, RepositoryMessage},
};

const MAILBOX_CAPACITY: usize = 64;

pub struct RepositoryActor {
  repository: Repository,
  lifecycle: Arc<LifecycleManager>,
  permits: Arc<Semaphore>,
  rx: mpsc::Receiver<RepositoryMessage>,
  cancel: CancellationToken,
}

impl RepositoryActor {
  /// Spawn the actor task, returning a handle to its mailbox and the join
  /// handle shutdown waits on.
  pub fn spawn(
    repository: Repository,
    lifecycle: Arc<LifecycleManager>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
  ) -> (RepositoryHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    let actor = Self {
      repository,
      lifecycle,
      permits,
      rx,
      cancel,
    };
    let join = tokio::spawn(actor.run());
    (RepositoryHandle::new(tx), join)
  }

  async fn run(mut self) {
    debug!(repository = %self.repository.name, "RepositoryActor started");

    loop {
      tokio::select! {
        biased;

        _ = self.cancel.cancelled() => {
          // Queued-but-unstarted work is dropped; in-flight work already
          // completed before we got here.
          debug!(repository = %self.repository.name, "RepositoryActor cancelled");
          break;
        }

        msg = self.rx.recv() => {
          match msg {
            Some(RepositoryMessage { command: RepositoryCommand::Shutdown, .. }) => {
              debug!(repository = %self.repository.name, "RepositoryActor shutting down");
              break;
            }
            Some(msg) => self.handle(msg).await,
            None => break,
          }
        }
      }
    }

    info!(repository = %self.repository.name, "RepositoryActor stopped");
  }

  async fn handle(&self, msg: RepositoryMessage) {
    let operation = msg.command.name();

    // The pool bound. Waiting here keeps this repository's queue intact
    // while other repositories use the workers.
    let permit = match self.permits.clone().acquire_owned().await {
      Ok(permit) => permit,
      Err(_) => {
        if let Some(reply) = msg.reply {
          let _ = reply.send(Err(ServiceError::ShuttingDown));
        }
        return;
      }
    };

    let result = self.execute(msg.command).await;
    drop(permit);

    match msg.reply {
      Some(reply) => {
        // Receiver may have given up waiting; that loses nothing, the
        // operation itself has already committed or failed.
        let _ = reply.send(result);
      }
      None => {
        // Fire-and-forget (scheduled) work: errors must not vanish.
        if let Err(e) = result {
          self.lifecycle.failures().report(&self.repository.name, operation, e);
        }
      }
    }
  }

  async fn execute(&self, command: RepositoryCommand) -> Result<OperationReport, ServiceError> {
    match command {
      RepositoryCommand::Index {
        settings,
        prefix,
        indexers,
        continuous,
      } => {
        self
          .lifecycle
          .incremental_index(&settings, &self.repository, prefix.as_deref(), indexers, continuous)
          .await
      }
      RepositoryCommand::Rebuild {
        settings,
        prefix,
        indexers,
      } => {
        self
          .lifecycle
          .rebuild_index(&settings, &self.repository, prefix.as_deref(), indexers)
          .await
      }
      RepositoryCommand::Purge { prefix } => self.lifecycle.purge_index(&self.repository, prefix.as_deref()).await,
      // Handled in run(); a reply-carrying shutdown still gets an answer.
      RepositoryCommand::Shutdown => Err(ServiceError::ShuttingDown),
    }
  }
}
