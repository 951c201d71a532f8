//! Artifact identity model.
//!
//! An artifact is identified by the composite key
//! `{group, artifact, version, classifier, extension}`, derived once from
//! the artifact's repository-relative path (standard Maven layout:
//! `group/dirs/artifact/version/artifact-version[-classifier].extension`)
//! and immutable afterwards. The rendered form of the key (`uinfo`) is what
//! the index store deduplicates on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Composite key uniquely identifying one artifact within a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactIdentity {
  /// Dotted group id, e.g. `com.acme`.
  pub group_id: String,
  /// Artifact id, e.g. `widget`.
  pub artifact_id: String,
  /// Version as named by the version directory, e.g. `1.0` or
  /// `2.0-SNAPSHOT`.
  pub version: String,
  /// Optional classifier, e.g. `sources`.
  pub classifier: Option<String>,
  /// File extension, e.g. `jar` or `tar.gz`.
  pub extension: String,
}

/// Why a path could not be interpreted as an artifact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
  #[error("path has too few segments for a maven layout: {0}")]
  TooShallow(String),
  #[error("file name does not start with '<artifact>-': {0}")]
  NameMismatch(String),
  #[error("file name does not carry the directory version '{version}': {file}")]
  VersionMismatch { version: String, file: String },
  #[error("file name has no extension: {0}")]
  NoExtension(String),
}

impl ArtifactIdentity {
  /// Derive an identity from a repository-relative path in Maven layout.
  ///
  /// The path must have at least `group/artifact/version/file` segments;
  /// everything before the last three is the (dotted) group. The file name
  /// must begin with `<artifact>-<version>`, where for `-SNAPSHOT`
  /// versions the file may instead carry the timestamped form
  /// `<base>-<yyyymmdd.hhmmss>-<build>`.
  pub fn from_path(path: &str) -> Result<Self, IdentityError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 4 {
      return Err(IdentityError::TooShallow(path.to_string()));
    }

    let file = segments[segments.len() - 1];
    let version = segments[segments.len() - 2];
    let artifact_id = segments[segments.len() - 3];
    let group_id = segments[..segments.len() - 3].join(".");

    let rest = file
      .strip_prefix(artifact_id)
      .and_then(|r| r.strip_prefix('-'))
      .ok_or_else(|| IdentityError::NameMismatch(file.to_string()))?;

    // Consume the version portion of the file name. Snapshot versions may
    // appear either literally or in their timestamped deployment form.
    let after_version = match rest.strip_prefix(version) {
      Some(after) => after,
      None => {
        let base = version.strip_suffix("-SNAPSHOT");
        match base
          .and_then(|b| rest.strip_prefix(b))
          .and_then(|r| r.strip_prefix('-'))
          .and_then(strip_snapshot_timestamp)
        {
          Some(after) => after,
          None => {
            return Err(IdentityError::VersionMismatch {
              version: version.to_string(),
              file: file.to_string(),
            });
          }
        }
      }
    };

    let (classifier, extension) = match after_version.as_bytes().first() {
      Some(b'.') => (None, &after_version[1..]),
      Some(b'-') => {
        let tail = &after_version[1..];
        match tail.split_once('.') {
          Some((classifier, ext)) if !classifier.is_empty() && !ext.is_empty() => {
            (Some(classifier.to_string()), ext)
          }
          _ => return Err(IdentityError::NoExtension(file.to_string())),
        }
      }
      _ => return Err(IdentityError::NoExtension(file.to_string())),
    };

    if extension.is_empty() {
      return Err(IdentityError::NoExtension(file.to_string()));
    }

    Ok(Self {
      group_id,
      artifact_id: artifact_id.to_string(),
      version: version.to_string(),
      classifier,
      extension: extension.to_string(),
    })
  }

  /// The rendered composite key. `NA` marks an absent classifier, so the
  /// key is unambiguous as a flat string.
  pub fn uinfo(&self) -> String {
    format!(
      "{}|{}|{}|{}|{}",
      self.group_id,
      self.artifact_id,
      self.version,
      self.classifier.as_deref().unwrap_or("NA"),
      self.extension
    )
  }

  /// The first segment of the group id, used for root-group aggregation.
  pub fn root_group(&self) -> &str {
    self.group_id.split('.').next().unwrap_or(&self.group_id)
  }

  /// Whether this identity names a non-final (snapshot-style) build.
  pub fn is_snapshot(&self) -> bool {
    is_snapshot_version(&self.version)
  }
}

impl fmt::Display for ArtifactIdentity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.uinfo())
  }
}

/// Whether a version string denotes a non-final build: either the literal
/// `-SNAPSHOT` suffix or the timestamped deployment form
/// `<base>-<yyyymmdd.hhmmss>-<build>`.
pub fn is_snapshot_version(version: &str) -> bool {
  if version.ends_with("-SNAPSHOT") {
    return true;
  }
  match version.rfind('-') {
    Some(split) => {
      let stamp_start = version[..split].rfind('-').map(|i| i + 1).unwrap_or(0);
      strip_snapshot_timestamp(&version[stamp_start..]).is_some_and(|rest| rest.is_empty())
    }
    None => false,
  }
}

/// Strip a leading `yyyymmdd.hhmmss-<build>` timestamp, returning the
/// remainder, or `None` if the input does not start with one.
fn strip_snapshot_timestamp(s: &str) -> Option<&str> {
  let bytes = s.as_bytes();
  if bytes.len() < 17 {
    return None;
  }
  let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
  if !(digits(0..8) && bytes[8] == b'.' && digits(9..15) && bytes[15] == b'-') {
    return None;
  }
  let mut end = 16;
  while end < bytes.len() && bytes[end].is_ascii_digit() {
    end += 1;
  }
  if end == 16 {
    return None; // no build number
  }
  Some(&s[end..])
}

// ============================================================================
// Tests
// ============================================================================
