//! Actor handles for communicating with repository actors.
//!
//! Handles are cheap to clone; each request creates its own reply channel.

use tokio::sync::{mpsc, oneshot};

use crate::service::{OperationReport, ServiceError};

use super::message::{RepositoryCommand, RepositoryMessage};

/// Handle to one repository actor's mailbox.
#[derive(Clone, Debug)]
pub struct RepositoryHandle {
  pub tx: mpsc::Sender<RepositoryMessage>,
}

impl RepositoryHandle {
  pub fn new(tx: mpsc::Sender<RepositoryMessage>) -> Self {
    Self { tx }
  }

  /// Queue a command without waiting for its outcome. Used by the
  /// scheduler; failures are routed to the failure channel by the actor.
  pub async fn send(&self, command: RepositoryCommand) -> Result<(), SendError> {
    self
      .tx
      .send(RepositoryMessage { command, reply: None })
      .await
      .map_err(|_| SendError::ActorGone)
  }

  /// Queue a command and wait for it to run to completion.
  ///
  /// Waiting covers time spent queued behind earlier operations on the
  /// same repository; that ordering is the per-repository FIFO guarantee.
  pub async fn request(&self, command: RepositoryCommand) -> Result<OperationReport, ServiceError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    self
      .tx
      .send(RepositoryMessage {
        command,
        reply: Some(reply_tx),
      })
      .await
      .map_err(|_| ServiceError::ShuttingDown)?;

    reply_rx.await.map_err(|_| ServiceError::ShuttingDown)?
  }
}

/// Error when sending to an actor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
  #[error("Actor has shut down")]
  ActorGone,
}
