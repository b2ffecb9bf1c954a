//! Metrics-artifact discovery and archival
//!
//! The workload persists its metrics table into its working directory
//! under a fixed prefix/suffix convention. The collector renames each
//! run's artifact to a run-indexed name before the next run starts, so
//! consecutive runs can never clobber each other's output. Archived
//! artifacts are left on disk as an audit trail.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Filename convention for one artifact kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPattern {
    /// Fixed filename prefix, e.g. `akita_sim_`
    pub prefix: String,
    /// Fixed filename suffix, e.g. `.sqlite3`
    pub suffix: String,
}

impl ArtifactPattern {
    /// Create a pattern from a prefix and suffix
    #[must_use]
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// The simulator's metrics database convention
    #[must_use]
    pub fn metrics_sqlite() -> Self {
        Self::new("akita_sim_", ".sqlite3")
    }

    /// Whether a file name matches this pattern
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        name.starts_with(&self.prefix) && name.ends_with(&self.suffix)
    }
}

impl std::fmt::Display for ArtifactPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*{}", self.prefix, self.suffix)
    }
}

/// Locates and archives the artifacts a run leaves behind
#[derive(Debug, Clone)]
pub struct ArtifactCollector {
    pattern: ArtifactPattern,
    logical_name: String,
}

impl ArtifactCollector {
    /// Create a collector for one artifact kind with the logical name
    /// used for archived copies
    #[must_use]
    pub fn new(pattern: ArtifactPattern, logical_name: impl Into<String>) -> Self {
        Self {
            pattern,
            logical_name: logical_name.into(),
        }
    }

    /// Matching file names in `dir`, sorted for a stable choice
    fn matches_in(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if self.pattern.matches(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove leftover matching artifacts from a previous run
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read or a file
    /// cannot be removed.
    pub fn purge_stale(&self, dir: &Path) -> Result<usize> {
        let names = self.matches_in(dir)?;
        for name in &names {
            std::fs::remove_file(dir.join(name))?;
        }
        Ok(names.len())
    }

    /// Find the artifact the run just produced
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArtifact`] when nothing matches; a run
    /// that exits successfully without persisting its metrics has
    /// violated its contract with the harness.
    pub fn find(&self, dir: &Path) -> Result<PathBuf> {
        let names = self.matches_in(dir)?;
        names.first().map(|name| dir.join(name)).ok_or_else(|| {
            Error::MissingArtifact {
                dir: dir.to_path_buf(),
                pattern: self.pattern.to_string(),
            }
        })
    }

    /// The run-indexed name an artifact is archived under
    #[must_use]
    pub fn archived_path(&self, dir: &Path, run_index: usize) -> PathBuf {
        dir.join(format!(
            "{}_{}{}",
            self.logical_name, run_index, self.pattern.suffix
        ))
    }

    /// Find the run's artifact and rename it to its run-indexed name
    ///
    /// Must happen before the next run in the same configuration
    /// starts; otherwise the second run's write silently corrupts the
    /// comparison.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArtifact`] when the run left no
    /// artifact, or an IO error if the rename fails.
    pub fn archive(&self, dir: &Path, run_index: usize) -> Result<PathBuf> {
        let found = self.find(dir)?;
        let archived = self.archived_path(dir, run_index);
        std::fs::rename(&found, &archived)?;
        Ok(archived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).expect("write file");
    }

    #[test]
    fn test_pattern_matches() {
        let pattern = ArtifactPattern::metrics_sqlite();
        assert!(pattern.matches("akita_sim_x7f3.sqlite3"));
        assert!(!pattern.matches("akita_sim_x7f3.csv"));
        assert!(!pattern.matches("other_sim.sqlite3"));
    }

    #[test]
    fn test_pattern_display() {
        let pattern = ArtifactPattern::new("m_", ".csv");
        assert_eq!(pattern.to_string(), "m_*.csv");
    }

    #[test]
    fn test_find_missing_is_fatal() {
        let dir = TempDir::new().expect("tempdir");
        let collector =
            ArtifactCollector::new(ArtifactPattern::metrics_sqlite(), "deterministic_metrics");

        let err = collector.find(dir.path()).expect_err("nothing to find");
        assert!(matches!(err, Error::MissingArtifact { .. }));
    }

    #[test]
    fn test_find_picks_sorted_first() {
        let dir = TempDir::new().expect("tempdir");
        touch(dir.path(), "akita_sim_b.sqlite3", "b");
        touch(dir.path(), "akita_sim_a.sqlite3", "a");
        let collector =
            ArtifactCollector::new(ArtifactPattern::metrics_sqlite(), "deterministic_metrics");

        let found = collector.find(dir.path()).expect("artifact present");
        assert_eq!(
            found.file_name().and_then(|n| n.to_str()),
            Some("akita_sim_a.sqlite3")
        );
    }

    #[test]
    fn test_archive_renames_with_run_index() {
        let dir = TempDir::new().expect("tempdir");
        touch(dir.path(), "akita_sim_run.sqlite3", "payload");
        let collector =
            ArtifactCollector::new(ArtifactPattern::metrics_sqlite(), "deterministic_metrics");

        let archived = collector.archive(dir.path(), 3).expect("archive");
        assert_eq!(
            archived.file_name().and_then(|n| n.to_str()),
            Some("deterministic_metrics_3.sqlite3")
        );
        assert!(!dir.path().join("akita_sim_run.sqlite3").exists());
        assert_eq!(
            std::fs::read_to_string(archived).expect("read archived"),
            "payload"
        );
    }

    #[test]
    fn test_archived_names_do_not_match_pattern() {
        // The rename must take the artifact out of the search set, or
        // the next run's find would pick up the archive.
        let collector =
            ArtifactCollector::new(ArtifactPattern::metrics_sqlite(), "deterministic_metrics");
        let pattern = ArtifactPattern::metrics_sqlite();
        let archived = collector.archived_path(Path::new("."), 0);
        let name = archived
            .file_name()
            .and_then(|n| n.to_str())
            .expect("name");
        assert!(!pattern.matches(name));
    }

    #[test]
    fn test_purge_stale_removes_only_matches() {
        let dir = TempDir::new().expect("tempdir");
        touch(dir.path(), "akita_sim_old.sqlite3", "stale");
        touch(dir.path(), "deterministic_metrics_0.sqlite3", "keep");
        let collector =
            ArtifactCollector::new(ArtifactPattern::metrics_sqlite(), "deterministic_metrics");

        let removed = collector.purge_stale(dir.path()).expect("purge");
        assert_eq!(removed, 1);
        assert!(!dir.path().join("akita_sim_old.sqlite3").exists());
        assert!(dir.path().join("deterministic_metrics_0.sqlite3").exists());
    }

    #[test]
    fn test_rename_before_overwrite_preserves_bytes() {
        let dir = TempDir::new().expect("tempdir");
        let collector = ArtifactCollector::new(ArtifactPattern::new("m_", ".csv"), "archive");

        touch(dir.path(), "m_run.csv", "first run");
        let first = collector.archive(dir.path(), 0).expect("archive 0");

        // Next run writes under the raw convention again.
        touch(dir.path(), "m_run.csv", "second run");
        let second = collector.archive(dir.path(), 1).expect("archive 1");

        assert_eq!(
            std::fs::read_to_string(first).expect("read 0"),
            "first run"
        );
        assert_eq!(
            std::fs::read_to_string(second).expect("read 1"),
            "second run"
        );
    }
}
