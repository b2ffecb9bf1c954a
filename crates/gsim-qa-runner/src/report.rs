//! Step records and the report sink
//!
//! Every build, run, and check produces a record that is kept
//! regardless of outcome. Output is routed through an injected sink so
//! the medium (console, log file, structured report) is a pluggable
//! collaborator rather than global state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

/// What kind of step a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepKind {
    /// Build-collaborator invocation
    Build,
    /// One acceptance run of one configuration
    Run,
    /// Disassembly byte-diff against the reference listing
    Disassembly,
    /// A full determinism verification of one target
    Determinism,
}

/// Record of one harness step
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Step kind
    pub kind: StepKind,
    /// Target the step belongs to
    pub target: String,
    /// Human-readable step label, e.g. `fir timing gpus=1,2`
    pub label: String,
    /// Whether the step passed
    pub passed: bool,
    /// Failure detail or other annotation
    pub detail: Option<String>,
    /// Wall-clock duration of the step
    pub duration_ms: u64,
    /// When the step finished
    pub timestamp: DateTime<Utc>,
}

impl StepRecord {
    /// Create a record for a finished step
    #[must_use]
    pub fn new(
        kind: StepKind,
        target: impl Into<String>,
        label: impl Into<String>,
        passed: bool,
        duration_ms: u64,
    ) -> Self {
        Self {
            kind,
            target: target.into(),
            label: label.into(),
            passed,
            detail: None,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    /// Create a record for a step timed from `started`
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn finished(
        kind: StepKind,
        target: impl Into<String>,
        label: impl Into<String>,
        passed: bool,
        started: Instant,
    ) -> Self {
        Self::new(
            kind,
            target,
            label,
            passed,
            started.elapsed().as_millis() as u64,
        )
    }

    /// Attach a failure detail or annotation
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Destination for step records
///
/// The session pushes every record here as it happens, so a human can
/// watch which specific configuration failed while the matrix keeps
/// running.
pub trait ReportSink {
    /// A step finished
    fn step(&mut self, record: &StepRecord);

    /// The whole session finished with the given aggregate verdict
    fn session_finished(&mut self, _failed: bool) {}
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn step(&mut self, _record: &StepRecord) {}
}

/// Sink that keeps records in memory, mainly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    /// Records in arrival order
    pub records: Vec<StepRecord>,
    /// Aggregate verdict, once the session finished
    pub finished: Option<bool>,
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportSink for MemorySink {
    fn step(&mut self, record: &StepRecord) {
        self.records.push(record.clone());
    }

    fn session_finished(&mut self, failed: bool) {
        self.finished = Some(failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_construction() {
        let record = StepRecord::new(StepKind::Run, "fir", "fir timing gpus=1", false, 120)
            .with_detail("exit code 1");
        assert_eq!(record.kind, StepKind::Run);
        assert_eq!(record.target, "fir");
        assert!(!record.passed);
        assert_eq!(record.detail.as_deref(), Some("exit code 1"));
        assert_eq!(record.duration_ms, 120);
    }

    #[test]
    fn test_finished_measures_from_start() {
        let start = Instant::now();
        let record = StepRecord::finished(StepKind::Run, "fir", "fir emu gpus=1", true, start);
        assert!(record.passed);
        assert!(record.duration_ms < 10_000);
    }

    #[test]
    fn test_memory_sink_collects() {
        let mut sink = MemorySink::new();
        sink.step(&StepRecord::new(StepKind::Build, "fir", "build fir", true, 5));
        sink.step(&StepRecord::new(StepKind::Run, "fir", "fir emu gpus=1", true, 9));
        sink.session_finished(false);

        assert_eq!(sink.records.len(), 2);
        assert_eq!(sink.finished, Some(false));
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let mut sink = NullSink;
        sink.step(&StepRecord::new(StepKind::Run, "fir", "x", true, 0));
        sink.session_finished(true);
    }

    #[test]
    fn test_record_serializes() {
        let record = StepRecord::new(StepKind::Determinism, "fir-small", "fir-small", true, 42);
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains("Determinism"));
        assert!(json.contains("fir-small"));
    }
}
