//! Artifact index subsystem.
//!
//! Keeps a searchable metadata index consistent with the on-disk artifact
//! tree of one or more package repositories. The core is the incremental
//! reconciliation engine in [`reconcile`]; the [`actor`] layer serializes
//! all work per repository and bounds cross-repository parallelism, and
//! [`subsystem::IndexerSubsystem`] ties it together for the owning process.

pub mod actor;
pub mod domain;
pub mod facade;
pub mod reconcile;
pub mod scan;
pub mod service;
pub mod store;
pub mod subsystem;

pub use artidex_core::{ArtifactIdentity, ConfigDiff, IndexInterval, IndexerSet, IndexerSettings, IndexingTask};

pub use domain::{Repository, RepositoryStorage};
pub use facade::IndexFacade;
pub use service::{FailureReport, OperationReport, ServiceError};
pub use store::JsonIndexStore;
pub use subsystem::IndexerSubsystem;
