//! Per-pass aggregates.

use std::collections::HashSet;

use artidex_core::ArtifactIdentity;

use crate::{scan::ScanFailure, store::IndexSummary};

/// Counters and aggregates built during one pass.
///
/// Owned exclusively by the in-flight pass; flushed into the store summary
/// and the failure channel at finalization, then dropped.
#[derive(Debug, Default)]
pub struct ScanAccumulator {
  pub total_indexed: u64,
  group_ids: HashSet<String>,
  root_groups: HashSet<String>,
  pub errors: Vec<ScanFailure>,
}

impl ScanAccumulator {
  /// Fold one discovered identity into the group aggregates.
  pub fn record(&mut self, identity: &ArtifactIdentity) {
    self.root_groups.insert(identity.root_group().to_string());
    self.group_ids.insert(identity.group_id.clone());
  }

  pub fn error(&mut self, failure: ScanFailure) {
    self.errors.push(failure);
  }

  /// The summary metadata this pass will write into the store.
  pub fn summary(&self) -> IndexSummary {
    IndexSummary {
      root_groups: self.root_groups.iter().cloned().collect(),
      all_groups: self.group_ids.iter().cloned().collect(),
    }
  }
}
