//! Configuration surface for the artifact index subsystem.
//!
//! Settings are deserialized from the host's configuration file (TOML) and
//! handed to the subsystem at startup. Changes at runtime go through
//! `IndexerSettings::diff` so the owning process can decide whether the
//! scheduler needs a rebuild or a full restart is required.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Indexing Interval
// ============================================================================

/// How often a recurring indexing task fires.
///
/// Smaller intervals keep the index fresher at the cost of repository scan
/// load; for small instances the default daily interval is plenty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexInterval {
  TwiceHourly,
  Hourly,
  BiHourly,
  #[default]
  Daily,
  Weekly,
  Monthly,
}

impl IndexInterval {
  /// The wall-clock duration between two fixed-rate firings.
  pub fn duration(&self) -> Duration {
    const HOUR: u64 = 60 * 60;
    const DAY: u64 = 24 * HOUR;
    match self {
      IndexInterval::TwiceHourly => Duration::from_secs(30 * 60),
      IndexInterval::Hourly => Duration::from_secs(HOUR),
      IndexInterval::BiHourly => Duration::from_secs(2 * HOUR),
      IndexInterval::Daily => Duration::from_secs(DAY),
      IndexInterval::Weekly => Duration::from_secs(7 * DAY),
      IndexInterval::Monthly => Duration::from_secs(30 * DAY),
    }
  }
}

// ============================================================================
// Indexer Set
// ============================================================================

/// Which content indexers run during a pass.
///
/// The flags map to record fields: `minimal` covers size/mtime/packaging,
/// `extra_metadata` adds content checksums, the remaining flags cover
/// packaging-specific metadata. Any of `extra_metadata`,
/// `archetype_metadata`, `plugin_metadata` or `jar_contents` implicitly
/// enables `minimal` (see [`IndexerSet::effective`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerSet {
  /// Minimal set of fields: size, mtime, packaging (default: true)
  pub minimal: bool,
  /// Misc. content metadata such as checksums (default: false)
  pub extra_metadata: bool,
  /// Archetype metadata (default: false)
  pub archetype_metadata: bool,
  /// Build-plugin metadata (default: false)
  pub plugin_metadata: bool,
  /// OSGi manifest metadata (default: false)
  pub osgi_metadata: bool,
  /// Archive entry digests for jar files (default: false)
  pub jar_contents: bool,
}

impl Default for IndexerSet {
  fn default() -> Self {
    Self {
      minimal: true,
      extra_metadata: false,
      archetype_metadata: false,
      plugin_metadata: false,
      osgi_metadata: false,
      jar_contents: false,
    }
  }
}

impl IndexerSet {
  /// An empty set: no content indexers at all. Used by purge, which only
  /// needs to locate and delete records.
  pub fn none() -> Self {
    Self {
      minimal: false,
      extra_metadata: false,
      archetype_metadata: false,
      plugin_metadata: false,
      osgi_metadata: false,
      jar_contents: false,
    }
  }

  /// Apply the implication rule: content-bearing indexers require the
  /// minimal fields to be present too.
  pub fn effective(&self) -> Self {
    let mut set = *self;
    if set.extra_metadata || set.archetype_metadata || set.plugin_metadata || set.jar_contents {
      set.minimal = true;
    }
    set
  }

  /// Union of two sets, flag by flag.
  pub fn union(&self, other: &IndexerSet) -> Self {
    Self {
      minimal: self.minimal || other.minimal,
      extra_metadata: self.extra_metadata || other.extra_metadata,
      archetype_metadata: self.archetype_metadata || other.archetype_metadata,
      plugin_metadata: self.plugin_metadata || other.plugin_metadata,
      osgi_metadata: self.osgi_metadata || other.osgi_metadata,
      jar_contents: self.jar_contents || other.jar_contents,
    }
  }

  pub fn is_empty(&self) -> bool {
    !(self.minimal
      || self.extra_metadata
      || self.archetype_metadata
      || self.plugin_metadata
      || self.osgi_metadata
      || self.jar_contents)
  }
}

// ============================================================================
// Indexing Task
// ============================================================================

/// One recurring indexing task.
///
/// The scheduler registers one fixed-rate timer per enabled task; each
/// firing runs an incremental pass over every locally backed repository
/// with this task's indexer set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingTask {
  /// Display name; not used for dispatch.
  pub name: String,

  /// Whether this task is registered at all (default: true)
  pub enabled: bool,

  /// How often to run a full reconciliation scan (default: daily)
  pub interval: IndexInterval,

  /// Continuous mode: the index is assumed to be updated incrementally as
  /// artifacts arrive, so the scan skips snapshot loading and stale removal
  /// (default: false)
  pub continuous: bool,

  /// Which content indexers this task runs with.
  pub indexers: IndexerSet,
}

impl Default for IndexingTask {
  fn default() -> Self {
    Self {
      name: "default".to_string(),
      enabled: true,
      interval: IndexInterval::Daily,
      continuous: false,
      indexers: IndexerSet::default(),
    }
  }
}

// ============================================================================
// Subsystem Settings
// ============================================================================

/// Top-level settings for the artifact index subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerSettings {
  /// Master switch for the whole subsystem (default: false)
  pub enabled: bool,

  /// Root directory for the per-repository index and export trees
  /// (default: ".index"). Layout underneath is
  /// `<index_path>/<repository>/search-index/` for the live index and
  /// `<index_path>/<repository>/maven-index/` for packed exports.
  pub index_path: String,

  /// Whether to write incremental export chunks alongside the full export
  /// (default: true)
  pub incremental_chunks: bool,

  /// How many incremental chunks to retain; older chunks are pruned
  /// (default: 32, minimum 1)
  pub incremental_chunks_count: usize,

  /// Write checksum side-files next to every export artifact
  /// (default: false)
  pub create_checksum_files: bool,

  /// Repository-wide continuous update mode; per-task `continuous` wins
  /// when set (default: false)
  pub continuous_index_updates: bool,

  /// Maximum number of repositories indexed in parallel. Takes effect only
  /// after a subsystem restart (default: 1, minimum 1)
  pub max_parallel_index_repositories: usize,

  /// Recurring indexing tasks (default: one enabled daily task).
  pub indexing_tasks: Vec<IndexingTask>,
}

impl Default for IndexerSettings {
  fn default() -> Self {
    Self {
      enabled: false,
      index_path: ".index".to_string(),
      incremental_chunks: true,
      incremental_chunks_count: 32,
      create_checksum_files: false,
      continuous_index_updates: false,
      max_parallel_index_repositories: 1,
      indexing_tasks: vec![IndexingTask::default()],
    }
  }
}

impl IndexerSettings {
  /// The tasks that should actually be registered with the scheduler.
  pub fn enabled_tasks(&self) -> impl Iterator<Item = &IndexingTask> {
    self.indexing_tasks.iter().filter(|t| t.enabled)
  }

  /// Distinct union of the indexer sets across all enabled tasks.
  pub fn all_indexers(&self) -> IndexerSet {
    self
      .enabled_tasks()
      .fold(IndexerSet::none(), |acc, task| acc.union(&task.indexers.effective()))
  }

  /// Whether a task should skip snapshot loading and stale removal.
  pub fn is_continuous(&self, task: &IndexingTask) -> bool {
    self.continuous_index_updates || task.continuous
  }

  /// The worker-pool size, clamped to at least one permit.
  pub fn pool_size(&self) -> usize {
    self.max_parallel_index_repositories.max(1)
  }

  /// Chunk retention, clamped to at least one chunk.
  pub fn chunk_count(&self) -> usize {
    self.incremental_chunks_count.max(1)
  }

  /// Compare against a newer settings value and report what the change
  /// means operationally. The caller is responsible for triggering a
  /// scheduler rebuild when `task_set_changed` is set; `pool_size_changed`
  /// requires a restart and is only reported.
  ///
  /// Recurring tasks snapshot the settings when they are registered, so
  /// every field a scheduled pass reads (task list, continuous mode, index
  /// path, pack controls) counts as a task-set change.
  pub fn diff(&self, new: &IndexerSettings) -> ConfigDiff {
    ConfigDiff {
      task_set_changed: self.enabled != new.enabled
        || self.indexing_tasks != new.indexing_tasks
        || self.continuous_index_updates != new.continuous_index_updates
        || self.index_path != new.index_path
        || self.incremental_chunks != new.incremental_chunks
        || self.incremental_chunks_count != new.incremental_chunks_count
        || self.create_checksum_files != new.create_checksum_files,
      pool_size_changed: self.pool_size() != new.pool_size(),
    }
  }
}

/// What changed between two settings values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigDiff {
  /// Settings visible to scheduled passes differ; the scheduler must be
  /// rebuilt so new ticks pick them up.
  pub task_set_changed: bool,
  /// The worker-pool size differs; takes effect only after restart.
  pub pool_size_changed: bool,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn defaults_match_documented_values() {
    let settings = IndexerSettings::default();
    assert!(!settings.enabled);
    assert_eq!(settings.index_path, ".index");
    assert_eq!(settings.incremental_chunks_count, 32);
    assert_eq!(settings.max_parallel_index_repositories, 1);
    assert_eq!(settings.indexing_tasks.len(), 1);
    assert_eq!(settings.indexing_tasks[0].interval, IndexInterval::Daily);
  }

  #[test]
  fn indexer_implication_forces_minimal() {
    let set = IndexerSet {
      minimal: false,
      jar_contents: true,
      ..IndexerSet::none()
    };
    assert!(set.effective().minimal);

    let set = IndexerSet {
      minimal: false,
      osgi_metadata: true,
      ..IndexerSet::none()
    };
    // osgi alone does not imply minimal
    assert!(!set.effective().minimal);
  }

  #[test]
  fn all_indexers_unions_enabled_tasks_only() {
    let settings = IndexerSettings {
      indexing_tasks: vec![
        IndexingTask {
          indexers: IndexerSet {
            extra_metadata: true,
            ..IndexerSet::default()
          },
          ..IndexingTask::default()
        },
        IndexingTask {
          enabled: false,
          indexers: IndexerSet {
            jar_contents: true,
            ..IndexerSet::default()
          },
          ..IndexingTask::default()
        },
      ],
      ..IndexerSettings::default()
    };

    let union = settings.all_indexers();
    assert!(union.minimal);
    assert!(union.extra_metadata);
    assert!(!union.jar_contents, "disabled task must not contribute");
  }

  #[test]
  fn diff_flags_task_and_pool_changes() {
    let old = IndexerSettings::default();

    let mut new = old.clone();
    new.indexing_tasks[0].interval = IndexInterval::Hourly;
    let diff = old.diff(&new);
    assert!(diff.task_set_changed);
    assert!(!diff.pool_size_changed);

    let mut new = old.clone();
    new.max_parallel_index_repositories = 4;
    let diff = old.diff(&new);
    assert!(!diff.task_set_changed);
    assert!(diff.pool_size_changed);
  }

  #[test]
  fn diff_flags_pack_settings_as_scheduler_visible() {
    // Scheduled passes read these from their settings snapshot, so a change
    // must trigger a scheduler rebuild to take effect.
    let old = IndexerSettings::default();

    let mut new = old.clone();
    new.create_checksum_files = true;
    assert!(old.diff(&new).task_set_changed);

    let mut new = old.clone();
    new.incremental_chunks_count = 8;
    assert!(old.diff(&new).task_set_changed);

    let mut new = old.clone();
    new.index_path = "elsewhere".to_string();
    assert!(old.diff(&new).task_set_changed);

    assert!(!old.diff(&old.clone()).task_set_changed);
  }

  #[test]
  fn interval_durations_are_ordered() {
    let mut last = Duration::ZERO;
    for interval in [
      IndexInterval::TwiceHourly,
      IndexInterval::Hourly,
      IndexInterval::BiHourly,
      IndexInterval::Daily,
      IndexInterval::Weekly,
      IndexInterval::Monthly,
    ] {
      assert!(interval.duration() > last);
      last = interval.duration();
    }
  }

  #[test]
  fn settings_roundtrip_through_toml() {
    let settings = IndexerSettings {
      enabled: true,
      indexing_tasks: vec![IndexingTask {
        name: "nightly".to_string(),
        interval: IndexInterval::Weekly,
        ..IndexingTask::default()
      }],
      ..IndexerSettings::default()
    };

    let text = toml::to_string(&settings).unwrap();
    let parsed: IndexerSettings = toml::from_str(&text).unwrap();
    assert_eq!(parsed, settings);
  }

  #[test]
  fn partial_toml_fills_defaults() {
    let parsed: IndexerSettings = toml::from_str("enabled = true").unwrap();
    assert!(parsed.enabled);
    assert_eq!(parsed.incremental_chunks_count, 32);
    assert_eq!(parsed.indexing_tasks.len(), 1);
  }
}
