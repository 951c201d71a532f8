//! One reconciliation pass.
//!
//! A pass moves through IDLE → SCANNING → FINALIZING → IDLE, encoded by
//! ownership: [`ReconcilePass::begin`] enters SCANNING, event methods are
//! only callable while the pass value is alive, and [`ReconcilePass::finish`]
//! consumes it for FINALIZING. The caller (the repository actor) guarantees
//! no two passes for one repository overlap.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info, trace};

use crate::{
  scan::ScanFailure,
  store::{ArtifactRecord, IndexContext, StoreError, StoredRecord},
};

use super::ScanAccumulator;

/// How a pass is scoped.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
  /// Restrict the pass to artifacts whose path starts with this prefix.
  /// Entries outside the prefix are untouched, even if never revisited.
  pub prefix: Option<String>,
  /// Continuous mode: the index is assumed already reconciled
  /// incrementally, so snapshot loading and stale removal are skipped.
  pub continuous: bool,
}

/// Outcome of one finished pass.
#[derive(Debug)]
pub struct ReconcileReport {
  pub repository: String,
  /// Artifacts newly written or updated this pass.
  pub indexed: u64,
  /// Artifacts confirmed alive from the prior snapshot, untouched.
  pub confirmed: u64,
  /// Distinct stale identities removed.
  pub removed: u64,
  /// Per-artifact failures accumulated during the scan. These never fail
  /// the pass; the caller reports them in bulk.
  pub errors: Vec<ScanFailure>,
}

/// In-flight pass state. Exclusively owned, never shared across passes.
pub struct ReconcilePass {
  options: ReconcileOptions,
  /// Snapshot entries not yet confirmed by a discovery event, keyed by
  /// uinfo. Whatever is left here at finish time is the stale set.
  pending: HashMap<String, Vec<StoredRecord>>,
  /// Identities already handled this pass, for snapshot-version dedupe.
  processed: HashSet<String>,
  accumulator: ScanAccumulator,
  confirmed: u64,
}

impl ReconcilePass {
  /// Enter SCANNING: load the pending snapshot for the pass scope.
  pub async fn begin(ctx: &mut dyn IndexContext, options: ReconcileOptions) -> Result<Self, StoreError> {
    let pending = if options.continuous {
      HashMap::new()
    } else {
      let snapshot = ctx.load_snapshot(options.prefix.as_deref()).await?;
      let mut pending: HashMap<String, Vec<StoredRecord>> = HashMap::new();
      for stored in snapshot {
        pending.entry(stored.record.identity.uinfo()).or_default().push(stored);
      }
      pending
    };

    debug!(
      repository = %ctx.repository(),
      pending = pending.len(),
      prefix = options.prefix.as_deref().unwrap_or(""),
      continuous = options.continuous,
      "Reconciliation pass started"
    );

    Ok(Self {
      options,
      pending,
      processed: HashSet::new(),
      accumulator: ScanAccumulator::default(),
      confirmed: 0,
    })
  }

  /// Handle one discovered artifact.
  pub async fn artifact_discovered(
    &mut self,
    ctx: &mut dyn IndexContext,
    record: ArtifactRecord,
  ) -> Result<(), StoreError> {
    let uinfo = record.identity.uinfo();

    // Only the first snapshot build encountered per pass is indexed; later
    // physical files sharing the identity are skipped, not errors.
    if record.identity.is_snapshot() && self.processed.contains(&uinfo) {
      trace!(uinfo = %uinfo, "Skipping duplicate snapshot instance");
      return Ok(());
    }
    self.processed.insert(uinfo.clone());

    // Aggregates cover confirmed identities too: the summary is rewritten
    // whole at finish and must describe the entire live index.
    self.accumulator.record(&record.identity);

    if self.pending.remove(&uinfo).is_some() {
      // Confirmed alive from the prior snapshot, nothing to rewrite.
      self.confirmed += 1;
      return Ok(());
    }

    ctx.upsert(record).await?;
    self.accumulator.total_indexed += 1;
    Ok(())
  }

  /// Handle one scan failure. Non-fatal, the pass continues.
  pub fn artifact_error(&mut self, failure: ScanFailure) {
    trace!(path = %failure.path, message = %failure.message, "Artifact failure accumulated");
    self.accumulator.error(failure);
  }

  /// Enter FINALIZING: write aggregates, commit, remove the stale set,
  /// commit again. The returned report carries the accumulated failures.
  pub async fn finish(mut self, ctx: &mut dyn IndexContext) -> Result<ReconcileReport, StoreError> {
    ctx.write_summary(self.accumulator.summary()).await?;
    ctx.commit().await?;

    let mut removed = 0u64;
    if !self.options.continuous {
      let mut stale_rows = BTreeSet::new();
      for uinfo in self.pending.keys() {
        // An exact-match query instead of the remembered row ids, so
        // duplicate rows for the same identity are collapsed too.
        for stored in ctx.find_exact(uinfo).await? {
          stale_rows.insert(stored.row);
        }
      }
      removed = self.pending.len() as u64;
      self.pending.clear();

      if !stale_rows.is_empty() {
        let rows: Vec<u64> = stale_rows.into_iter().collect();
        let deleted = ctx.delete_rows(&rows).await?;
        debug!(repository = %ctx.repository(), identities = removed, rows = deleted, "Removed stale entries");
      }
      ctx.commit().await?;
    }

    let report = ReconcileReport {
      repository: ctx.repository().to_string(),
      indexed: self.accumulator.total_indexed,
      confirmed: self.confirmed,
      removed,
      errors: std::mem::take(&mut self.accumulator.errors),
    };

    info!(
      repository = %report.repository,
      indexed = report.indexed,
      confirmed = report.confirmed,
      removed = report.removed,
      errors = report.errors.len(),
      "Reconciliation pass finished"
    );
    Ok(report)
  }
}

// ============================================================================
// Tests
// ============================================================================
