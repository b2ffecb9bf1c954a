//! Determinism verification
//!
//! Drives N repeated runs of one configuration and pairwise-compares
//! each run's metrics artifact against its immediate predecessor:
//! `Build, Run(0), Archive(0), Run(1), Archive(1), Compare(0,1), ...`.
//! The first failing comparison aborts the whole verifier; a single
//! nondeterminism hit invalidates every later run's relevance. This is
//! the one fail-fast path in the harness.

use crate::artifact::{ArtifactCollector, ArtifactPattern};
use crate::command::{CommandRunner, OutputMode};
use crate::compare::compare;
use crate::compile::BuildStage;
use crate::error::{Error, Result};
use crate::table::{MetricsTable, DEFAULT_METRICS_TABLE};
use crate::target::TestTarget;
use std::path::PathBuf;

/// Number of repeated runs in the reference matrix
pub const DEFAULT_DETERMINISM_RUNS: usize = 5;

/// Tunables of the determinism verifier
#[derive(Debug, Clone)]
pub struct DeterminismConfig {
    /// Repeated runs per target (N >= 2 for any comparison to happen)
    pub runs: usize,
    /// Naming convention of the raw metrics artifact
    pub pattern: ArtifactPattern,
    /// Logical name archived artifacts are indexed under
    pub logical_name: String,
    /// Metrics table name inside SQLite artifacts
    pub table: String,
    /// Flag that makes the workload persist all metrics
    pub report_flag: String,
}

impl Default for DeterminismConfig {
    fn default() -> Self {
        Self {
            runs: DEFAULT_DETERMINISM_RUNS,
            pattern: ArtifactPattern::metrics_sqlite(),
            logical_name: "deterministic_metrics".to_string(),
            table: DEFAULT_METRICS_TABLE.to_string(),
            report_flag: "-report-all".to_string(),
        }
    }
}

/// Successful verification summary
#[derive(Debug, Clone)]
pub struct DeterminismReport {
    /// Number of runs performed
    pub runs: usize,
    /// Archived artifacts, in run order, left on disk as an audit trail
    pub artifacts: Vec<PathBuf>,
}

/// Repeated-run verifier for one target
pub struct DeterminismVerifier<'a> {
    runner: &'a dyn CommandRunner,
    build_command: Vec<String>,
    config: DeterminismConfig,
}

impl<'a> DeterminismVerifier<'a> {
    /// Create a verifier with the default configuration
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, build_command: Vec<String>) -> Self {
        Self {
            runner,
            build_command,
            config: DeterminismConfig::default(),
        }
    }

    /// Override the verifier configuration
    #[must_use]
    pub fn with_config(mut self, config: DeterminismConfig) -> Self {
        self.config = config;
        self
    }

    /// Build once, then run, archive, and compare N times
    ///
    /// # Errors
    ///
    /// Fails fast with [`Error::Determinism`] on the first diverging
    /// pair of consecutive runs. Also fails on build failure, nonzero
    /// workload exit, or a missing artifact; all of these invalidate
    /// the remaining runs.
    pub fn verify(&self, target: &TestTarget) -> Result<DeterminismReport> {
        let build = BuildStage::new(self.runner, self.build_command.clone());
        if build.build(target) {
            return Err(Error::BuildFailed {
                target: target.name.clone(),
            });
        }

        let collector =
            ArtifactCollector::new(self.config.pattern.clone(), &self.config.logical_name);
        let mut artifacts: Vec<PathBuf> = Vec::with_capacity(self.config.runs);

        for run_index in 0..self.config.runs {
            collector.purge_stale(&target.path)?;
            self.run_workload(target)?;

            let archived = collector.archive(&target.path, run_index)?;

            if let Some(previous) = artifacts.last() {
                let previous_table =
                    MetricsTable::load_with_table(previous, &self.config.table)?;
                let current_table =
                    MetricsTable::load_with_table(&archived, &self.config.table)?;
                let verdict = compare(&previous_table, &current_table);
                if !verdict.is_equal() {
                    return Err(Error::Determinism {
                        left: previous.clone(),
                        right: archived,
                        verdict,
                    });
                }
            }

            artifacts.push(archived);
        }

        Ok(DeterminismReport {
            runs: self.config.runs,
            artifacts,
        })
    }

    /// One timing run with full metric reporting
    fn run_workload(&self, target: &TestTarget) -> Result<()> {
        let mut args = vec!["-timing".to_string(), self.config.report_flag.clone()];
        args.extend(target.size_args.iter().cloned());

        let program = target.program();
        let output = self
            .runner
            .run(&program, &args, &target.path, OutputMode::Discard)?;
        if !output.success {
            return Err(Error::WorkloadFailed {
                command: format!("{program} {}", args.join(" ")),
                exit_code: output.exit_code,
            });
        }
        Ok(())
    }
}
