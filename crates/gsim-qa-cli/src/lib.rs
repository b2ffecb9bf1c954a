//! gsim-qa CLI library
//!
//! The logic behind the binary, kept here so filter construction, suite
//! loading, and command execution stay testable without spawning the
//! CLI itself.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::missing_const_for_fn)]
// Allow common patterns in test code
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

use gsim_qa_report::{generate_markdown, JunitReport};
use gsim_qa_runner::{
    expand, AcceptanceSession, CommandRunner, DeterminismConfig, DeterminismVerifier, ReportSink,
    SessionFilter, StepKind, StepRecord, Suite,
};
use regex::Regex;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Instant;

/// Filter flags as they arrive from the command line
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Regex over target names
    pub benchmark: Option<String>,
    /// Only cells with exactly this many devices
    pub num_gpus: Option<usize>,
    /// Only parallel cells
    pub only_parallel: bool,
    /// Skip parallel cells
    pub no_parallel: bool,
    /// Only unified-memory cells
    pub only_unified_memory: bool,
    /// Skip unified-memory cells
    pub no_unified_memory: bool,
    /// Only unified-device cells
    pub only_unified_gpus: bool,
    /// Skip unified-device cells
    pub no_unified_gpus: bool,
}

/// Turn raw flag values into a validated session filter
///
/// # Errors
///
/// Returns a message for an invalid benchmark regex or a contradictory
/// only/no flag pair.
pub fn build_filter(options: &FilterOptions) -> Result<SessionFilter, String> {
    let benchmark = match &options.benchmark {
        Some(pattern) => Some(
            Regex::new(pattern).map_err(|e| format!("invalid --benchmark pattern: {e}"))?,
        ),
        None => None,
    };

    let pairs = [
        (options.only_parallel, options.no_parallel, "parallel"),
        (
            options.only_unified_memory,
            options.no_unified_memory,
            "unified-memory",
        ),
        (
            options.only_unified_gpus,
            options.no_unified_gpus,
            "unified-gpu",
        ),
    ];
    for (only, no, axis) in pairs {
        if only && no {
            return Err(format!(
                "--only-{axis} and --no-{axis} exclude every cell"
            ));
        }
    }

    Ok(SessionFilter {
        benchmark,
        num_devices: options.num_gpus,
        only_parallel: options.only_parallel,
        no_parallel: options.no_parallel,
        only_unified_memory: options.only_unified_memory,
        no_unified_memory: options.no_unified_memory,
        only_unified_devices: options.only_unified_gpus,
        no_unified_devices: options.no_unified_gpus,
    })
}

/// Load a suite file, or fall back to the built-in reference suite
///
/// # Errors
///
/// Returns a message if the file cannot be read or fails validation.
pub fn load_suite(path: Option<&Path>) -> Result<Suite, String> {
    match path {
        Some(path) => Suite::from_yaml_path(path)
            .map_err(|e| format!("cannot load suite {}: {e}", path.display())),
        None => Ok(Suite::reference()),
    }
}

/// What a finished command hands back to the binary
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Aggregate verdict: true if any step failed
    pub failed: bool,
    /// Every step record, in execution order
    pub records: Vec<StepRecord>,
}

/// Run the acceptance matrix for a suite
///
/// # Errors
///
/// Returns a message only for runner errors outside the normal
/// taxonomy; build, run, and spawn failures land in the outcome
/// instead.
pub fn run_acceptance(
    runner: &dyn CommandRunner,
    sink: &mut dyn ReportSink,
    suite: &Suite,
    filter: SessionFilter,
    dry_run: bool,
) -> Result<RunOutcome, String> {
    let mut session = AcceptanceSession::new(runner, sink)
        .with_filter(filter)
        .with_dry_run(dry_run);
    let failed = session
        .run_suite(suite)
        .map_err(|e| format!("acceptance session aborted: {e}"))?;
    Ok(RunOutcome {
        failed,
        records: session.records().to_vec(),
    })
}

/// Run the determinism verifier over a suite's deterministic targets
///
/// Each target gets one record; a verifier error fails that target and
/// the session moves on to the next one.
///
/// # Errors
///
/// Returns a message if the suite has no deterministic targets, or if
/// none survives the benchmark filter.
pub fn run_determinism(
    runner: &dyn CommandRunner,
    sink: &mut dyn ReportSink,
    suite: &Suite,
    runs: usize,
    benchmark: Option<&Regex>,
) -> Result<RunOutcome, String> {
    let targets: Vec<_> = suite
        .deterministic
        .iter()
        .filter(|t| benchmark.is_none_or(|re| re.is_match(&t.name)))
        .collect();
    if targets.is_empty() {
        return Err(format!(
            "suite `{}` has no deterministic targets matching the filter",
            suite.name
        ));
    }

    let config = DeterminismConfig {
        runs,
        ..DeterminismConfig::default()
    };
    let mut records = Vec::with_capacity(targets.len());
    let mut failed = false;

    for target in targets {
        let start = Instant::now();
        let verifier =
            DeterminismVerifier::new(runner, suite.build_command.clone()).with_config(config.clone());
        let record = match verifier.verify(target) {
            Ok(report) => StepRecord::finished(
                StepKind::Determinism,
                &target.name,
                format!("{} determinism", target.name),
                true,
                start,
            )
            .with_detail(format!("{} identical runs", report.runs)),
            Err(e) => StepRecord::finished(
                StepKind::Determinism,
                &target.name,
                format!("{} determinism", target.name),
                false,
                start,
            )
            .with_detail(e.to_string()),
        };
        failed |= !record.passed;
        sink.step(&record);
        records.push(record);
    }

    sink.session_finished(failed);
    Ok(RunOutcome { failed, records })
}

/// Write the optional report artifacts a command was asked for
///
/// # Errors
///
/// Returns a message naming the file that could not be written.
pub fn write_run_artifacts(
    suite_name: &str,
    records: &[StepRecord],
    json: Option<&Path>,
    junit: Option<&Path>,
    markdown: Option<&Path>,
) -> Result<(), String> {
    if let Some(path) = json {
        let text = serde_json::to_string_pretty(records)
            .map_err(|e| format!("cannot serialize records: {e}"))?;
        write_file(path, &text)?;
    }
    if let Some(path) = junit {
        let xml = JunitReport::new(suite_name)
            .generate(records)
            .map_err(|e| format!("cannot generate JUnit report: {e}"))?;
        write_file(path, &xml)?;
    }
    if let Some(path) = markdown {
        write_file(path, &generate_markdown(suite_name, records))?;
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<(), String> {
    std::fs::write(path, contents).map_err(|e| format!("cannot write {}: {e}", path.display()))
}

/// Human-readable listing of a suite's targets and their matrix sizes
#[must_use]
pub fn format_suite_listing(suite: &Suite) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "suite: {}", suite.name);
    let _ = writeln!(out, "build: {}", suite.build_command.join(" "));
    let _ = writeln!(out, "\nacceptance targets:");
    for target in &suite.targets {
        let _ = writeln!(
            out,
            "  {:<24} {:<32} cells={}",
            target.name,
            target.path.display(),
            expand(target).len()
        );
    }
    if !suite.deterministic.is_empty() {
        let _ = writeln!(out, "\ndeterministic targets:");
        for target in &suite.deterministic {
            let _ = writeln!(
                out,
                "  {:<24} {:<32} {}",
                target.name,
                target.path.display(),
                target.size_args.join(" ")
            );
        }
    }
    out
}
