//! Messages understood by repository actors.

use std::sync::Arc;

use tokio::sync::oneshot;

use artidex_core::{IndexerSet, IndexerSettings};

use crate::service::{OperationReport, ServiceError};

/// One lifecycle operation to run inside the repository's slot.
///
/// Commands carry the settings snapshot taken when they were enqueued, so a
/// configuration change mid-queue never alters work already accepted.
#[derive(Debug)]
pub enum RepositoryCommand {
  Index {
    settings: Arc<IndexerSettings>,
    prefix: Option<String>,
    indexers: IndexerSet,
    continuous: bool,
  },
  Rebuild {
    settings: Arc<IndexerSettings>,
    prefix: Option<String>,
    indexers: IndexerSet,
  },
  Purge {
    prefix: Option<String>,
  },
  Shutdown,
}

impl RepositoryCommand {
  pub fn name(&self) -> &'static str {
    match self {
      RepositoryCommand::Index { .. } => "index",
      RepositoryCommand::Rebuild { .. } => "rebuild",
      RepositoryCommand::Purge { .. } => "purge",
      RepositoryCommand::Shutdown => "shutdown",
    }
  }
}

/// Envelope delivered to a repository actor.
#[derive(Debug)]
pub struct RepositoryMessage {
  pub command: RepositoryCommand,
  /// Where to send the outcome. `None` for fire-and-forget invocations
  /// (scheduled ticks); their failures go to the failure channel instead.
  pub reply: Option<oneshot::Sender<Result<OperationReport, ServiceError>>>,
}
