//! Filesystem walker.
//!
//! Runs `walkdir` on a blocking thread and streams discovery events back
//! over a bounded channel so the consumer applies backpressure. Hidden
//! entries, checksum/signature side-files and repository metadata files are
//! skipped; everything else is expected to be an artifact in Maven layout.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use artidex_core::{ArtifactIdentity, IdentityError, IndexerSet};

use super::{DiscoveryEvent, ScanFailure, indexers};

const EVENT_BUFFER: usize = 256;

/// Extensions of side-files deployed next to artifacts, never indexed.
const SIDE_FILE_EXTENSIONS: &[&str] = &["sha1", "md5", "sha256", "sha512", "asc", "lastUpdated"];

/// Start a scan over `root`, restricted to `prefix` when given.
///
/// A missing root or prefix directory yields an empty event stream, which
/// the engine treats as an empty tree.
pub fn scan(root: PathBuf, prefix: Option<String>, indexers: IndexerSet) -> mpsc::Receiver<DiscoveryEvent> {
  let (tx, rx) = mpsc::channel(EVENT_BUFFER);

  tokio::task::spawn_blocking(move || {
    let scan_root = match &prefix {
      Some(p) => root.join(p),
      None => root.clone(),
    };
    if !scan_root.is_dir() {
      debug!(root = %scan_root.display(), "Scan root does not exist, emitting nothing");
      return;
    }

    let walk = WalkDir::new(&scan_root)
      .follow_links(false)
      .into_iter()
      // depth 0 is the scan root itself, which may legitimately be hidden
      .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_str()));

    for entry in walk {
      let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
          let path = e.path().map(|p| relative(&root, p)).unwrap_or_default();
          if tx
            .blocking_send(DiscoveryEvent::Failed(ScanFailure {
              path,
              message: e.to_string(),
            }))
            .is_err()
          {
            return; // consumer gone
          }
          continue;
        }
      };

      if !entry.file_type().is_file() {
        continue;
      }
      let Some(name) = entry.file_name().to_str() else {
        warn!(path = %entry.path().display(), "Skipping non-utf8 file name");
        continue;
      };
      if is_side_file(name) || is_repository_metadata(name) {
        continue;
      }

      let rel = relative(&root, entry.path());
      let event = match ArtifactIdentity::from_path(&rel) {
        Ok(identity) => match indexers::build_record(entry.path(), &rel, identity, &indexers) {
          Ok(record) => DiscoveryEvent::Discovered(record),
          Err(e) => DiscoveryEvent::Failed(ScanFailure {
            path: rel,
            message: format!("failed to read artifact: {e}"),
          }),
        },
        // Files that are not artifacts at all are skipped quietly; files
        // that look like artifacts but are misnamed are reported.
        Err(IdentityError::TooShallow(_)) | Err(IdentityError::NameMismatch(_)) => {
          trace!(path = %rel, "Skipping non-artifact file");
          continue;
        }
        Err(e) => DiscoveryEvent::Failed(ScanFailure {
          path: rel,
          message: e.to_string(),
        }),
      };

      if tx.blocking_send(event).is_err() {
        return;
      }
    }
  });

  rx
}

fn relative(root: &Path, path: &Path) -> String {
  path
    .strip_prefix(root)
    .unwrap_or(path)
    .to_string_lossy()
    .replace('\\', "/")
}

fn is_hidden(name: Option<&str>) -> bool {
  name.is_some_and(|n| n.starts_with('.'))
}

fn is_side_file(name: &str) -> bool {
  name
    .rsplit_once('.')
    .is_some_and(|(_, ext)| SIDE_FILE_EXTENSIONS.contains(&ext))
}

fn is_repository_metadata(name: &str) -> bool {
  name.starts_with("maven-metadata") && name.ends_with(".xml")
}

// ============================================================================
// Tests
// ============================================================================
