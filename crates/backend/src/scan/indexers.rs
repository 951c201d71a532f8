//! Content indexers.
//!
//! Build one [`ArtifactRecord`] from a discovered file. The minimal indexer
//! always fills path, size, mtime and packaging; the richer indexers add
//! content digests. Which ones run is decided by the effective indexer set
//! (implication rule applied).

use std::{fs::File, io, path::Path, time::UNIX_EPOCH};

use sha2::{Digest, Sha256, Sha512};

use artidex_core::{ArtifactIdentity, IndexerSet};

use crate::store::ArtifactRecord;

pub fn build_record(
  abs: &Path,
  rel: &str,
  identity: ArtifactIdentity,
  indexers: &IndexerSet,
) -> io::Result<ArtifactRecord> {
  let effective = indexers.effective();
  let meta = std::fs::metadata(abs)?;
  let modified = meta
    .modified()?
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs() as i64)
    .unwrap_or(0);

  let mut record = ArtifactRecord {
    packaging: identity.extension.clone(),
    identity,
    path: rel.to_string(),
    size: meta.len(),
    modified,
    sha256: None,
    sha512: None,
    generation: 0,
  };

  if effective.extra_metadata || effective.jar_contents {
    record.sha256 = Some(digest_file::<Sha256>(abs)?);
  }
  if effective.jar_contents {
    record.sha512 = Some(digest_file::<Sha512>(abs)?);
  }

  Ok(record)
}

fn digest_file<D: Digest + io::Write>(path: &Path) -> io::Result<String> {
  let mut file = File::open(path)?;
  let mut hasher = D::new();
  io::copy(&mut file, &mut hasher)?;
  Ok(hex::encode(hasher.finalize()))
}
