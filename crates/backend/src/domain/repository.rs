//! Repository descriptors.
//!
//! A repository is identified by name and backed by some artifact storage.
//! Only locally addressable storage can be scanned; operations against a
//! remote-backed repository fail validation up front instead of partway
//! through a pass.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where a repository's artifact tree lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepositoryStorage {
  /// Artifacts are files under a local root directory.
  Local { root: PathBuf },
  /// Artifacts live behind a remote endpoint. Not scannable.
  Remote { url: String },
}

/// One package repository known to the subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
  pub name: String,
  pub storage: RepositoryStorage,
}

impl Repository {
  /// Convenience constructor for a locally backed repository.
  pub fn local(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
    Self {
      name: name.into(),
      storage: RepositoryStorage::Local { root: root.into() },
    }
  }

  /// The local artifact root, if this repository is locally backed.
  pub fn local_root(&self) -> Option<&Path> {
    match &self.storage {
      RepositoryStorage::Local { root } => Some(root),
      RepositoryStorage::Remote { .. } => None,
    }
  }
}
