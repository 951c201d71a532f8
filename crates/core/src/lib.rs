//! Core domain types for the artidex subsystem.
//!
//! This crate holds the value types shared by every workspace member:
//! the configuration surface and the artifact identity model. It has no
//! runtime dependencies so that both the backend and the CLI can depend
//! on it without pulling in tokio.

pub mod artifact;
pub mod config;

pub use artifact::{ArtifactIdentity, IdentityError, is_snapshot_version};
pub use config::{
  ConfigDiff, IndexInterval, IndexerSet, IndexerSettings, IndexingTask,
};
