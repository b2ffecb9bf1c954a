//! End-to-end harness tests against real child processes
//!
//! Each test stands up a fake workload as a shell script in a temp
//! directory, then drives the real session or verifier over it.

#![cfg(unix)]
#![allow(clippy::expect_used)]

use gsim_qa_runner::{
    AcceptanceSession, ArtifactPattern, ComparisonVerdict, DeterminismConfig,
    DeterminismVerifier, Error, MemorySink, RealCommandRunner, StepKind, Suite, TestTarget,
};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

/// Write an executable shell script into `dir`
fn install_script(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut permissions = std::fs::metadata(&path).expect("stat script").permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).expect("chmod script");
}

fn script_suite(dir: &Path, script_body: &str) -> Suite {
    install_script(dir, "fakesim", script_body);
    Suite {
        name: "fake".to_string(),
        build_command: vec!["true".to_string()],
        targets: vec![TestTarget::new("fakesim", dir, "fakesim")],
        deterministic: Vec::new(),
    }
}

fn determinism_config(runs: usize) -> DeterminismConfig {
    DeterminismConfig {
        runs,
        pattern: ArtifactPattern::new("fake_metrics_", ".csv"),
        logical_name: "archived_metrics".to_string(),
        ..DeterminismConfig::default()
    }
}

#[test]
fn acceptance_matrix_against_real_processes() {
    let dir = TempDir::new().expect("tempdir");
    let suite = script_suite(dir.path(), "exit 0");

    let runner = RealCommandRunner::new();
    let mut sink = MemorySink::new();
    let mut session = AcceptanceSession::new(&runner, &mut sink);

    let failed = session.run_suite(&suite).expect("run suite");
    assert!(!failed);
    // 1 build + 4 single-device cells.
    assert_eq!(session.records().len(), 5);
    assert!(session.records().iter().all(|r| r.passed));
}

#[test]
fn failing_workload_fails_session_but_runs_all_cells() {
    let dir = TempDir::new().expect("tempdir");
    // Fail only timing runs; the others pass.
    let suite = script_suite(
        dir.path(),
        r#"for arg in "$@"; do [ "$arg" = "-timing=true" ] && exit 3; done; exit 0"#,
    );

    let runner = RealCommandRunner::new();
    let mut sink = MemorySink::new();
    let mut session = AcceptanceSession::new(&runner, &mut sink);

    let failed = session.run_suite(&suite).expect("run suite");
    assert!(failed);

    let runs: Vec<_> = session
        .records()
        .iter()
        .filter(|r| r.kind == StepKind::Run)
        .collect();
    assert_eq!(runs.len(), 4);
    assert_eq!(runs.iter().filter(|r| !r.passed).count(), 2);
    assert!(runs
        .iter()
        .filter(|r| !r.passed)
        .all(|r| r.detail.as_deref() == Some("exit code 3")));
}

#[test]
fn determinism_verifier_accepts_stable_workload() {
    let dir = TempDir::new().expect("tempdir");
    install_script(
        dir.path(),
        "fakesim",
        "printf 'id,cycles\\n0,100\\n1,250\\n' > fake_metrics_run.csv",
    );
    let target = TestTarget::new("fakesim", dir.path(), "fakesim");

    let runner = RealCommandRunner::new();
    let verifier = DeterminismVerifier::new(&runner, vec!["true".to_string()])
        .with_config(determinism_config(5));

    let report = verifier.verify(&target).expect("deterministic workload");
    assert_eq!(report.runs, 5);
    assert_eq!(report.artifacts.len(), 5);
    for (index, artifact) in report.artifacts.iter().enumerate() {
        assert!(artifact.ends_with(format!("archived_metrics_{index}.csv")));
        assert!(artifact.exists(), "audit trail must stay on disk");
    }
}

#[test]
fn determinism_verifier_fails_fast_on_divergence() {
    let dir = TempDir::new().expect("tempdir");
    // Every run emits a different value: the pid changes per process.
    install_script(
        dir.path(),
        "fakesim",
        "printf 'id,cycles\\n0,%s\\n' \"$$\" > fake_metrics_run.csv",
    );
    let target = TestTarget::new("fakesim", dir.path(), "fakesim");

    let runner = RealCommandRunner::new();
    let verifier = DeterminismVerifier::new(&runner, vec!["true".to_string()])
        .with_config(determinism_config(5));

    let err = verifier.verify(&target).expect_err("nondeterministic workload");
    match err {
        Error::Determinism { left, right, verdict } => {
            assert!(left.ends_with("archived_metrics_0.csv"));
            assert!(right.ends_with("archived_metrics_1.csv"));
            assert!(matches!(verdict, ComparisonVerdict::RowDivergence { index: 0, .. }));
        }
        other => panic!("expected determinism error, got {other}"),
    }

    // Fail-fast: runs 2..5 never happened, so their archives are absent.
    assert!(dir.path().join("archived_metrics_1.csv").exists());
    assert!(!dir.path().join("archived_metrics_2.csv").exists());
}

#[test]
fn determinism_verifier_raises_on_missing_artifact() {
    let dir = TempDir::new().expect("tempdir");
    install_script(dir.path(), "fakesim", "exit 0");
    let target = TestTarget::new("fakesim", dir.path(), "fakesim");

    let runner = RealCommandRunner::new();
    let verifier = DeterminismVerifier::new(&runner, vec!["true".to_string()])
        .with_config(determinism_config(2));

    let err = verifier.verify(&target).expect_err("no artifact written");
    assert!(matches!(err, Error::MissingArtifact { .. }));
}

#[test]
fn archived_artifacts_survive_later_runs_unchanged() {
    let dir = TempDir::new().expect("tempdir");
    install_script(
        dir.path(),
        "fakesim",
        "printf 'id,cycles\\n0,100\\n' > fake_metrics_run.csv",
    );
    let target = TestTarget::new("fakesim", dir.path(), "fakesim");

    let runner = RealCommandRunner::new();
    let verifier = DeterminismVerifier::new(&runner, vec!["true".to_string()])
        .with_config(determinism_config(3));
    verifier.verify(&target).expect("deterministic workload");

    let first = std::fs::read(dir.path().join("archived_metrics_0.csv")).expect("read archive");
    assert_eq!(first, b"id,cycles\n0,100\n");
}

#[test]
fn schema_is_stable_across_configurations() {
    // The same workload produces the same column set regardless of the
    // arguments it was driven with.
    let dir = TempDir::new().expect("tempdir");
    install_script(
        dir.path(),
        "fakesim",
        "printf 'id,cycles\\n0,100\\n' > fake_metrics_run.csv",
    );
    let target = TestTarget::new("fakesim", dir.path(), "fakesim")
        .with_size_args(&["-length=64"]);

    let runner = RealCommandRunner::new();
    let verifier = DeterminismVerifier::new(&runner, vec!["true".to_string()])
        .with_config(determinism_config(2));
    let report = verifier.verify(&target).expect("deterministic workload");

    let tables: Vec<_> = report
        .artifacts
        .iter()
        .map(|p| gsim_qa_runner::MetricsTable::load(p).expect("load artifact"))
        .collect();
    assert!(tables.windows(2).all(|w| w[0].columns == w[1].columns));
}

#[test]
fn failed_build_leaves_no_executable_and_matrix_still_completes() {
    // Nothing is ever built, so the first target's executable does not
    // exist; its runs must be recorded as failures, not abort the
    // session before the healthy sibling.
    let broken_dir = TempDir::new().expect("tempdir");
    let healthy_dir = TempDir::new().expect("tempdir");
    install_script(healthy_dir.path(), "fakesim", "exit 0");
    let suite = Suite {
        name: "mixed".to_string(),
        build_command: vec!["false".to_string()],
        targets: vec![
            TestTarget::new("brokensim", broken_dir.path(), "brokensim"),
            TestTarget::new("fakesim", healthy_dir.path(), "fakesim"),
        ],
        deterministic: Vec::new(),
    };

    let runner = RealCommandRunner::new();
    let mut sink = MemorySink::new();
    let mut session = AcceptanceSession::new(&runner, &mut sink);

    let failed = session.run_suite(&suite).expect("run suite");
    assert!(failed);

    let broken_runs: Vec<_> = session
        .records()
        .iter()
        .filter(|r| r.target == "brokensim" && r.kind == StepKind::Run)
        .collect();
    assert_eq!(broken_runs.len(), 4);
    assert!(broken_runs.iter().all(|r| !r.passed));
    assert!(broken_runs
        .iter()
        .all(|r| r.detail.as_deref().is_some_and(|d| d.contains("Failed to spawn"))));

    let healthy_runs: Vec<_> = session
        .records()
        .iter()
        .filter(|r| r.target == "fakesim" && r.kind == StepKind::Run)
        .collect();
    assert_eq!(healthy_runs.len(), 4);
    assert!(healthy_runs.iter().all(|r| r.passed));
}

#[test]
fn build_failure_recorded_and_session_continues() {
    let dir = TempDir::new().expect("tempdir");
    install_script(dir.path(), "fakesim", "exit 0");
    let suite = Suite {
        name: "fake".to_string(),
        build_command: vec!["false".to_string()],
        targets: vec![TestTarget::new("fakesim", dir.path(), "fakesim")],
        deterministic: Vec::new(),
    };

    let runner = RealCommandRunner::new();
    let mut sink = MemorySink::new();
    let mut session = AcceptanceSession::new(&runner, &mut sink);

    let failed = session.run_suite(&suite).expect("run suite");
    assert!(failed);

    let build = session
        .records()
        .iter()
        .find(|r| r.kind == StepKind::Build)
        .expect("build record");
    assert!(!build.passed);
    // The runs still executed and passed on their own.
    assert!(session
        .records()
        .iter()
        .filter(|r| r.kind == StepKind::Run)
        .all(|r| r.passed));
}
