//! Index lifecycle services.
//!
//! [`LifecycleManager`] orchestrates the incremental / rebuild / purge
//! operations for one repository at a time; the [`FailureChannel`] carries
//! everything that must be reported but must not abort a pass.

mod failure;
mod lifecycle;

pub use failure::{FailureChannel, FailureReport};
pub use lifecycle::{LifecycleManager, Operation, OperationReport};

use crate::store::StoreError;

/// Typed failures crossing the service boundary.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
  /// The repository has no local artifact storage, so it cannot be
  /// scanned or purged. Returned before any work is scheduled.
  #[error("repository '{0}' is not locally addressable")]
  NotLocal(String),
  #[error("indexing is disabled")]
  Disabled,
  #[error(transparent)]
  Store(#[from] StoreError),
  /// The subsystem is shutting down and no longer accepts work.
  #[error("indexing subsystem is shutting down")]
  ShuttingDown,
}
