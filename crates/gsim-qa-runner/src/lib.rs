//! gsim-qa runner
//!
//! Acceptance-matrix orchestration and determinism verification for an
//! externally-built simulator workload. The harness builds each
//! benchmark, drives it across a combinatorial matrix of execution
//! configurations, and verifies bit-exact reproducibility of the
//! metrics artifacts it persists. Everything is strictly sequential;
//! the workload itself is opaque and observed only through exit status
//! and artifact contents.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
// Allow common patterns in test code
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::uninlined_format_args))]

pub mod artifact;
pub mod command;
pub mod compare;
pub mod compile;
pub mod determinism;
pub mod disasm;
pub mod error;
pub mod matrix;
pub mod report;
pub mod session;
pub mod table;
pub mod target;

pub use artifact::{ArtifactCollector, ArtifactPattern};
pub use command::{
    CommandOutput, CommandRunner, Invocation, MockCommandRunner, OutputMode, RealCommandRunner,
};
pub use compare::{compare, ComparisonVerdict};
pub use compile::BuildStage;
pub use determinism::{
    DeterminismConfig, DeterminismReport, DeterminismVerifier, DEFAULT_DETERMINISM_RUNS,
};
pub use disasm::DisasmOutcome;
pub use error::{Error, Result};
pub use matrix::{expand, DeviceSet, RunConfiguration};
pub use report::{MemorySink, NullSink, ReportSink, StepKind, StepRecord};
pub use session::{AcceptanceSession, SessionFilter};
pub use table::{CellValue, MetricsTable, DEFAULT_METRICS_TABLE};
pub use target::{DisassemblyCheck, Suite, TestTarget};
