//! Acceptance session: matrix driver and result aggregation
//!
//! Drives build, matrix expansion, and runs for every target in a
//! suite, strictly sequentially. Failures are collected into a single
//! OR-accumulated flag; nothing short-circuits here. The only fail-fast
//! path in the harness lives in the determinism verifier.

use crate::command::{CommandRunner, OutputMode};
use crate::compile::BuildStage;
use crate::disasm::{self, DisasmOutcome};
use crate::error::{Error, Result};
use crate::matrix::{expand, RunConfiguration};
use crate::report::{ReportSink, StepKind, StepRecord};
use crate::target::{Suite, TestTarget};
use regex::Regex;
use std::time::Instant;

/// Filters that narrow which matrix cells actually execute
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    /// Only targets whose name matches this pattern
    pub benchmark: Option<Regex>,
    /// Only cells with exactly this many devices
    pub num_devices: Option<usize>,
    /// Only parallel cells
    pub only_parallel: bool,
    /// Skip parallel cells
    pub no_parallel: bool,
    /// Only unified-memory cells
    pub only_unified_memory: bool,
    /// Skip unified-memory cells
    pub no_unified_memory: bool,
    /// Only unified-device cells
    pub only_unified_devices: bool,
    /// Skip unified-device cells
    pub no_unified_devices: bool,
}

impl SessionFilter {
    /// Whether a target is admitted at all
    #[must_use]
    pub fn admits_target(&self, target: &TestTarget) -> bool {
        self.benchmark
            .as_ref()
            .is_none_or(|re| re.is_match(&target.name))
    }

    /// Whether one matrix cell is admitted
    #[must_use]
    pub fn admits(&self, configuration: &RunConfiguration) -> bool {
        if self
            .num_devices
            .is_some_and(|n| configuration.devices.len() != n)
        {
            return false;
        }
        if self.only_parallel && !configuration.parallel {
            return false;
        }
        if self.no_parallel && configuration.parallel {
            return false;
        }
        if self.only_unified_memory && !configuration.unified_memory {
            return false;
        }
        if self.no_unified_memory && configuration.unified_memory {
            return false;
        }
        if self.only_unified_devices && !configuration.unified_devices {
            return false;
        }
        if self.no_unified_devices && configuration.unified_devices {
            return false;
        }
        true
    }
}

/// Sequential driver for a suite's acceptance matrix
pub struct AcceptanceSession<'a> {
    runner: &'a dyn CommandRunner,
    sink: &'a mut dyn ReportSink,
    filter: SessionFilter,
    dry_run: bool,
    records: Vec<StepRecord>,
    failed: bool,
}

impl<'a> AcceptanceSession<'a> {
    /// Create a session over a runner and a report sink
    pub fn new(runner: &'a dyn CommandRunner, sink: &'a mut dyn ReportSink) -> Self {
        Self {
            runner,
            sink,
            filter: SessionFilter::default(),
            dry_run: false,
            records: Vec::new(),
            failed: false,
        }
    }

    /// Narrow the matrix with filters
    #[must_use]
    pub fn with_filter(mut self, filter: SessionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Report every cell's command without executing anything
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run the whole suite to completion and return the aggregate
    /// failed flag
    ///
    /// Build and run failures are recorded and OR-combined, never
    /// raised. A workload that cannot be spawned at all, the expected
    /// state of every cell after a failed build, is recorded the same
    /// way.
    ///
    /// # Errors
    ///
    /// Propagates runner errors other than spawn failure.
    pub fn run_suite(&mut self, suite: &Suite) -> Result<bool> {
        for target in &suite.targets {
            if !self.filter.admits_target(target) {
                continue;
            }
            self.run_target(suite, target)?;
        }
        self.sink.session_finished(self.failed);
        Ok(self.failed)
    }

    /// Whether any step so far has failed
    #[must_use]
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// All step records so far, in execution order
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Serialize the records for archival
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn records_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    fn record(&mut self, record: StepRecord) {
        self.failed |= !record.passed;
        self.sink.step(&record);
        self.records.push(record);
    }

    /// Build once, then every admitted matrix cell, then the optional
    /// disassembly check
    fn run_target(&mut self, suite: &Suite, target: &TestTarget) -> Result<()> {
        let start = Instant::now();
        let build_failed = if self.dry_run {
            false
        } else {
            BuildStage::new(self.runner, suite.build_command.clone()).build(target)
        };
        let mut build_record = StepRecord::finished(
            StepKind::Build,
            &target.name,
            format!("build {}", target.name),
            !build_failed,
            start,
        );
        if self.dry_run {
            build_record = build_record.with_detail("dry run");
        }
        self.record(build_record);

        // A failed build is recorded but does not skip the runs; each
        // configuration surfaces its own failure signal.
        for configuration in expand(target) {
            if !self.filter.admits(&configuration) {
                continue;
            }
            self.run_configuration(target, &configuration)?;
        }

        if let Some(disassembly) = &target.disassembly {
            if !self.dry_run {
                let start = Instant::now();
                let outcome = disasm::check(self.runner, target, disassembly);
                let mut record = StepRecord::finished(
                    StepKind::Disassembly,
                    &target.name,
                    format!("{} disasm", target.name),
                    outcome.is_pass(),
                    start,
                );
                match outcome {
                    DisasmOutcome::Match => {}
                    DisasmOutcome::Mismatch { offset } => {
                        record = record.with_detail(format!("diverges at byte {offset}"));
                    }
                    DisasmOutcome::Failed { reason } => {
                        record = record.with_detail(reason);
                    }
                }
                self.record(record);
            }
        }

        Ok(())
    }

    fn run_configuration(
        &mut self,
        target: &TestTarget,
        configuration: &RunConfiguration,
    ) -> Result<()> {
        let label = configuration.label(&target.name);
        let args = configuration.workload_args(&target.size_args);

        if self.dry_run {
            let command = format!("{} {}", target.program(), args.join(" "));
            self.record(
                StepRecord::new(StepKind::Run, &target.name, label, true, 0)
                    .with_detail(format!("dry run: {command}")),
            );
            return Ok(());
        }

        let start = Instant::now();
        let output = match self
            .runner
            .run(&target.program(), &args, &target.path, OutputMode::Discard)
        {
            Ok(output) => output,
            // A missing executable after a failed build is an ordinary
            // run failure; the rest of the matrix keeps going.
            Err(spawn @ Error::Spawn { .. }) => {
                self.record(
                    StepRecord::finished(StepKind::Run, &target.name, label, false, start)
                        .with_detail(spawn.to_string()),
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let mut record =
            StepRecord::finished(StepKind::Run, &target.name, label, output.success, start);
        if !output.success {
            record = record.with_detail(format!("exit code {}", output.exit_code));
        }
        self.record(record);
        Ok(())
    }
}
