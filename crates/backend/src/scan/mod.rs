//! Artifact source.
//!
//! Walks a repository's artifact tree and emits discovery events over a
//! channel: one [`DiscoveryEvent::Discovered`] per artifact with its record
//! already built by the enabled content indexers, and one
//! [`DiscoveryEvent::Failed`] per artifact that could not be read or named.
//! Failures never stop the walk.

mod indexers;
mod walker;

use serde::{Deserialize, Serialize};

use crate::store::ArtifactRecord;

pub use walker::scan;

/// One event from the artifact source.
#[derive(Debug)]
pub enum DiscoveryEvent {
  Discovered(ArtifactRecord),
  Failed(ScanFailure),
}

/// A per-artifact failure, accumulated during a pass and reported in bulk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
  /// Repository-relative path of the offending file.
  pub path: String,
  pub message: String,
}

impl std::fmt::Display for ScanFailure {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}: {}", self.path, self.message)
  }
}
