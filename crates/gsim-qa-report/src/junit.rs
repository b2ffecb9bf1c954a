//! JUnit XML report generation
//!
//! Standard JUnit XML for CI integration (Jenkins, GitHub Actions).
//! Each step record maps to one test case; the step kind becomes the
//! class name.

use crate::error::Result;
use gsim_qa_runner::{StepKind, StepRecord};
use std::io::Write;

/// JUnit XML report generator
#[derive(Debug)]
pub struct JunitReport {
    suite_name: String,
}

impl JunitReport {
    /// Create a generator for the named suite
    #[must_use]
    pub fn new(suite_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
        }
    }

    /// Generate JUnit XML from session records
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn generate(&self, records: &[StepRecord]) -> Result<String> {
        let mut output = Vec::new();
        self.write_xml(&mut output, records)?;
        Ok(String::from_utf8_lossy(&output).to_string())
    }

    fn write_xml<W: Write>(&self, writer: &mut W, records: &[StepRecord]) -> Result<()> {
        let tests = records.len();
        let failures = records.iter().filter(|r| !r.passed).count();
        let time: f64 = records.iter().map(|r| r.duration_ms as f64 / 1000.0).sum();

        writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            writer,
            r#"<testsuite name="{}" tests="{tests}" failures="{failures}" errors="0" skipped="0" time="{time:.3}">"#,
            escape_xml(&self.suite_name),
        )?;

        for record in records {
            let class = class_name(record.kind);
            let name = escape_xml(&record.label);
            let seconds = record.duration_ms as f64 / 1000.0;
            if record.passed {
                writeln!(
                    writer,
                    r#"  <testcase classname="{class}" name="{name}" time="{seconds:.3}"/>"#
                )?;
            } else {
                writeln!(
                    writer,
                    r#"  <testcase classname="{class}" name="{name}" time="{seconds:.3}">"#
                )?;
                let message = record.detail.as_deref().unwrap_or("step failed");
                writeln!(
                    writer,
                    r#"    <failure message="{}"/>"#,
                    escape_xml(message)
                )?;
                writeln!(writer, "  </testcase>")?;
            }
        }

        writeln!(writer, "</testsuite>")?;
        Ok(())
    }
}

fn class_name(kind: StepKind) -> &'static str {
    match kind {
        StepKind::Build => "build",
        StepKind::Run => "run",
        StepKind::Disassembly => "disassembly",
        StepKind::Determinism => "determinism",
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<StepRecord> {
        vec![
            StepRecord::new(StepKind::Build, "fir", "build fir", true, 1500),
            StepRecord::new(StepKind::Run, "fir", "fir timing gpus=1,2", true, 2000),
            StepRecord::new(StepKind::Run, "fir", "fir emu gpus=1", false, 500)
                .with_detail("exit code 1"),
        ]
    }

    #[test]
    fn test_counts_in_header() {
        let xml = JunitReport::new("acceptance")
            .generate(&records())
            .expect("generate");
        assert!(xml.contains(r#"tests="3""#));
        assert!(xml.contains(r#"failures="1""#));
        assert!(xml.contains(r#"name="acceptance""#));
    }

    #[test]
    fn test_failure_element() {
        let xml = JunitReport::new("acceptance")
            .generate(&records())
            .expect("generate");
        assert!(xml.contains(r#"<failure message="exit code 1"/>"#));
    }

    #[test]
    fn test_passing_case_is_self_closed() {
        let xml = JunitReport::new("acceptance")
            .generate(&records())
            .expect("generate");
        assert!(xml.contains(r#"name="fir timing gpus=1,2" time="2.000"/>"#));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn test_empty_records() {
        let xml = JunitReport::new("empty").generate(&[]).expect("generate");
        assert!(xml.contains(r#"tests="0""#));
        assert!(xml.contains("</testsuite>"));
    }
}
