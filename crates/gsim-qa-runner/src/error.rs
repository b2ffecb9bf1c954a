//! Error types for gsim-qa-runner

use crate::compare::ComparisonVerdict;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the acceptance matrix
#[derive(Debug, Error)]
pub enum Error {
    /// The child process could not be started at all. A nonzero exit
    /// status is not an error; only spawn failure is.
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        /// The command that could not be started
        command: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The workload finished but left no metrics artifact behind. This
    /// is a contract violation between harness and workload, not an
    /// ordinary test failure.
    #[error("No artifact matching `{pattern}` found in {}", dir.display())]
    MissingArtifact {
        /// Directory that was searched
        dir: PathBuf,
        /// The prefix/suffix pattern that matched nothing
        pattern: String,
    },

    /// Two consecutive runs of an identical configuration produced
    /// different metrics artifacts.
    #[error("Nondeterministic results: {} vs {}: {verdict}", left.display(), right.display())]
    Determinism {
        /// Artifact from the earlier run
        left: PathBuf,
        /// Artifact from the later run
        right: PathBuf,
        /// The first point of divergence
        verdict: ComparisonVerdict,
    },

    /// Build failed inside the determinism verifier, where no runs can
    /// proceed without an executable.
    #[error("Build failed for target `{target}`")]
    BuildFailed {
        /// Name of the target that failed to build
        target: String,
    },

    /// The workload exited nonzero inside the determinism verifier.
    #[error("Workload failed: `{command}` (exit code: {exit_code})")]
    WorkloadFailed {
        /// The command that failed
        command: String,
        /// Exit code of the workload
        exit_code: i32,
    },

    /// A table row does not match the table's column count.
    #[error("Row has {actual} cells, table has {expected} columns")]
    RowArity {
        /// Number of columns in the table
        expected: usize,
        /// Number of cells in the offending row
        actual: usize,
    },

    /// The artifact file extension maps to no known loader.
    #[error("Unsupported artifact format: {}", path.display())]
    UnsupportedArtifact {
        /// The artifact path
        path: PathBuf,
    },

    /// Suite definition is invalid
    #[error("Invalid suite: {0}")]
    Suite(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parse error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
