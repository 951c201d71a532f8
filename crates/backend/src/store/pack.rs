//! Export/pack step.
//!
//! After a successful pass the committed index is serialized into a
//! distributable form under `<index_path>/<repo>/maven-index/`: one full
//! index file, a bounded set of incremental chunk files (one per index
//! generation), and optional checksum side-files. Packing works off a
//! [`PackSource`] snapshot so it never holds the live context open.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use super::{IndexSummary, PackSource, StoreError, StoredRecord};

const FULL_FILE: &str = "index-full.json";
const META_FILE: &str = "index-meta.json";
const CHUNK_PREFIX: &str = "index-chunk-";

/// Packing knobs, taken from the subsystem settings at pass time.
#[derive(Debug, Clone)]
pub struct PackSettings {
  pub incremental_chunks: bool,
  /// How many chunk files to retain, newest first. Minimum 1.
  pub incremental_chunks_count: usize,
  pub create_checksum_files: bool,
}

/// What a pack run produced, for logging.
#[derive(Debug, Default)]
pub struct PackReport {
  pub records: usize,
  pub chunks_written: usize,
  pub chunks_pruned: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct PackMeta {
  generation: u64,
  summary: IndexSummary,
  chunks: Vec<u64>,
}

/// Serialize `source` into `dest`.
///
/// The destination directory is created if missing. Existing chunk files
/// beyond the retention bound are pruned.
pub fn pack(source: &PackSource, dest: &Path, settings: &PackSettings) -> Result<PackReport, StoreError> {
  std::fs::create_dir_all(dest)?;
  let mut report = PackReport {
    records: source.rows.len(),
    ..Default::default()
  };

  write_file(
    &dest.join(FULL_FILE),
    &serde_json::to_vec_pretty(&source.rows).map_err(StoreError::Encode)?,
    settings.create_checksum_files,
  )?;

  let mut retained_chunks = Vec::new();
  if settings.incremental_chunks {
    // One chunk per generation still present in the index, newest first,
    // capped at the retention count.
    let mut generations: Vec<u64> = source.rows.iter().map(|r| r.record.generation).collect();
    generations.sort_unstable();
    generations.dedup();
    generations.reverse();
    generations.truncate(settings.incremental_chunks_count.max(1));

    for generation in &generations {
      let chunk: Vec<&StoredRecord> = source
        .rows
        .iter()
        .filter(|r| r.record.generation == *generation)
        .collect();
      write_file(
        &dest.join(format!("{CHUNK_PREFIX}{generation}.json")),
        &serde_json::to_vec_pretty(&chunk).map_err(StoreError::Encode)?,
        settings.create_checksum_files,
      )?;
      report.chunks_written += 1;
    }

    report.chunks_pruned = prune_chunks(dest, &generations)?;
    retained_chunks = generations;
  }

  let meta = PackMeta {
    generation: source.generation,
    summary: source.summary.clone(),
    chunks: retained_chunks,
  };
  write_file(
    &dest.join(META_FILE),
    &serde_json::to_vec_pretty(&meta).map_err(StoreError::Encode)?,
    settings.create_checksum_files,
  )?;

  debug!(
    repository = %source.repository,
    records = report.records,
    chunks = report.chunks_written,
    pruned = report.chunks_pruned,
    "Packed index"
  );
  Ok(report)
}

fn write_file(path: &Path, bytes: &[u8], checksum: bool) -> Result<(), StoreError> {
  std::fs::write(path, bytes)?;
  if checksum {
    let digest = hex::encode(Sha256::digest(bytes));
    std::fs::write(checksum_path(path), format!("{digest}\n"))?;
  }
  trace!(file = %path.display(), "Wrote pack file");
  Ok(())
}

fn checksum_path(path: &Path) -> std::path::PathBuf {
  let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".sha256");
  path.with_file_name(name)
}

/// Delete chunk files whose generation is not in `keep`, including their
/// checksum side-files. Returns how many chunks were removed.
fn prune_chunks(dest: &Path, keep: &[u64]) -> Result<usize, StoreError> {
  let mut pruned = 0;
  for entry in std::fs::read_dir(dest)?.flatten() {
    let name = entry.file_name();
    let Some(name) = name.to_str() else { continue };
    let Some(rest) = name.strip_prefix(CHUNK_PREFIX) else { continue };
    let Some(generation) = rest.strip_suffix(".json").and_then(|g| g.parse::<u64>().ok()) else {
      continue;
    };
    if keep.contains(&generation) {
      continue;
    }

    std::fs::remove_file(entry.path())?;
    let _ = std::fs::remove_file(checksum_path(&entry.path()));
    pruned += 1;
  }
  Ok(pruned)
}

// ============================================================================
// Tests
// ============================================================================
