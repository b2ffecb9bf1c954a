//! Markdown session summary
//!
//! A compact report for checking into run logs or posting on a PR:
//! summary counts, a per-target table, and a failure list.

use gsim_qa_runner::{StepKind, StepRecord};
use std::collections::BTreeMap;

/// Generate a markdown summary of a session's step records
#[must_use]
pub fn generate_markdown(suite_name: &str, records: &[StepRecord]) -> String {
    let mut md = String::with_capacity(2048);

    let total = records.len();
    let failed = records.iter().filter(|r| !r.passed).count();

    md.push_str(&format!("# Acceptance Report: {suite_name}\n\n"));
    md.push_str("## Summary\n\n");
    md.push_str(&format!("- **Steps**: {} passed / {failed} failed / {total} total\n", total - failed));
    md.push_str(&format!(
        "- **Verdict**: {}\n\n",
        if failed == 0 { "PASS" } else { "FAIL" }
    ));

    md.push_str("## Targets\n\n");
    md.push_str("| Target | Steps | Failed |\n");
    md.push_str("|--------|-------|--------|\n");
    let mut by_target: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in records {
        let entry = by_target.entry(&record.target).or_insert((0, 0));
        entry.0 += 1;
        if !record.passed {
            entry.1 += 1;
        }
    }
    for (target, (steps, failures)) in by_target {
        md.push_str(&format!("| {target} | {steps} | {failures} |\n"));
    }
    md.push('\n');

    let failures: Vec<&StepRecord> = records.iter().filter(|r| !r.passed).collect();
    if !failures.is_empty() {
        md.push_str("## Failures\n\n");
        for record in failures {
            let kind = match record.kind {
                StepKind::Build => "build",
                StepKind::Run => "run",
                StepKind::Disassembly => "disassembly",
                StepKind::Determinism => "determinism",
            };
            md.push_str(&format!("- `{}` ({kind})", record.label));
            if let Some(detail) = &record.detail {
                md.push_str(&format!(": {detail}"));
            }
            md.push('\n');
        }
        md.push('\n');
    }

    md
}
