//! Console report sink
//!
//! One human-readable pass/fail line per step, ANSI-colored when the
//! output is a terminal. The sink is injected into the session; no
//! global color state.

use gsim_qa_runner::{ReportSink, StepKind, StepRecord};
use std::io::{IsTerminal, Write};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Report sink that writes per-step lines to a writer
pub struct ConsoleReporter<W: Write> {
    writer: W,
    color: bool,
}

impl ConsoleReporter<std::io::Stdout> {
    /// Console reporter on stdout, with color iff stdout is a terminal
    #[must_use]
    pub fn stdout() -> Self {
        let stdout = std::io::stdout();
        let color = stdout.is_terminal();
        Self {
            writer: stdout,
            color,
        }
    }
}

impl<W: Write> ConsoleReporter<W> {
    /// Console reporter on an arbitrary writer
    #[must_use]
    pub fn new(writer: W, color: bool) -> Self {
        Self { writer, color }
    }

    fn paint(&self, passed: bool, text: &str) -> String {
        if self.color {
            let color = if passed { GREEN } else { RED };
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

fn kind_prefix(kind: StepKind) -> &'static str {
    match kind {
        StepKind::Build => "Compiled",
        StepKind::Run => "Ran",
        StepKind::Disassembly => "Disassembled",
        StepKind::Determinism => "Verified",
    }
}

impl<W: Write> ReportSink for ConsoleReporter<W> {
    fn step(&mut self, record: &StepRecord) {
        let status = if record.passed { "Passed." } else { "Failed." };
        let mut line = format!("{} {} {}", kind_prefix(record.kind), record.label, status);
        if let Some(detail) = &record.detail {
            line.push_str(&format!(" ({detail})"));
        }
        let line = self.paint(record.passed, &line);
        let _ = writeln!(self.writer, "{line}");
    }

    fn session_finished(&mut self, failed: bool) {
        let line = if failed {
            self.paint(false, "Some steps failed.")
        } else {
            self.paint(true, "All steps passed.")
        };
        let _ = writeln!(self.writer, "{line}");
    }
}
