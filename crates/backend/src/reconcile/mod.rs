//! Reconciliation engine.
//!
//! Brings one repository's index in line with its artifact tree: discovered
//! artifacts are confirmed or upserted against the pending snapshot loaded
//! at scan start, and whatever remains pending after the walk is the stale
//! set and gets removed. See [`ReconcilePass`] for the exact lifecycle.

mod accumulator;
mod pass;

pub use accumulator::ScanAccumulator;
pub use pass::{ReconcileOptions, ReconcilePass, ReconcileReport};
