//! Disassembly checking
//!
//! Runs the disassembler collaborator against a target's compiled
//! kernel binary and byte-diffs the captured text against a checked-in
//! reference listing. A mismatch is an ordinary recorded failure, not a
//! fatal condition.

use crate::command::{CommandRunner, OutputMode};
use crate::target::{DisassemblyCheck, TestTarget};

/// Result of one disassembly check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisasmOutcome {
    /// Output matched the reference byte-for-byte
    Match,
    /// Output differed from the reference
    Mismatch {
        /// First byte offset where output and reference differ, or the
        /// shorter length when one is a prefix of the other
        offset: usize,
    },
    /// The check could not be carried out at all
    Failed {
        /// Why the check failed (spawn error, missing reference, exit code)
        reason: String,
    },
}

impl DisasmOutcome {
    /// Whether the check passed
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Match)
    }
}

/// Run a target's disassembly check
///
/// Invokes the disassembler with the kernel binary as its argument,
/// working in the target's directory with captured output.
#[must_use]
pub fn check(
    runner: &dyn CommandRunner,
    target: &TestTarget,
    disassembly: &DisassemblyCheck,
) -> DisasmOutcome {
    let reference = match std::fs::read(target.path.join(&disassembly.reference)) {
        Ok(bytes) => bytes,
        Err(e) => {
            return DisasmOutcome::Failed {
                reason: format!("cannot read reference {}: {e}", disassembly.reference),
            }
        }
    };

    let program = disassembly.disassembler.display().to_string();
    let output = match runner.run(
        &program,
        &[disassembly.kernel_binary.clone()],
        &target.path,
        OutputMode::Capture,
    ) {
        Ok(output) => output,
        Err(e) => {
            return DisasmOutcome::Failed {
                reason: e.to_string(),
            }
        }
    };

    if !output.success {
        return DisasmOutcome::Failed {
            reason: format!("disassembler exit code {}", output.exit_code),
        };
    }

    diff_bytes(output.stdout.as_bytes(), &reference)
}

fn diff_bytes(actual: &[u8], reference: &[u8]) -> DisasmOutcome {
    let shared = actual.len().min(reference.len());
    for offset in 0..shared {
        if actual[offset] != reference[offset] {
            return DisasmOutcome::Mismatch { offset };
        }
    }
    if actual.len() != reference.len() {
        return DisasmOutcome::Mismatch { offset: shared };
    }
    DisasmOutcome::Match
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutput, MockCommandRunner};
    use tempfile::TempDir;

    fn sample_check() -> DisassemblyCheck {
        DisassemblyCheck {
            disassembler: "insts/gcn3disassembler/gcn3disassembler".into(),
            kernel_binary: "kernels.hsaco".to_string(),
            reference: "kernels.disasm".to_string(),
        }
    }

    #[test]
    fn test_diff_bytes_equal() {
        assert_eq!(diff_bytes(b"abc", b"abc"), DisasmOutcome::Match);
        assert_eq!(diff_bytes(b"", b""), DisasmOutcome::Match);
    }

    #[test]
    fn test_diff_bytes_divergence_offset() {
        assert_eq!(
            diff_bytes(b"abcX", b"abcY"),
            DisasmOutcome::Mismatch { offset: 3 }
        );
        assert_eq!(
            diff_bytes(b"abc", b"abcdef"),
            DisasmOutcome::Mismatch { offset: 3 }
        );
    }

    #[test]
    fn test_check_match() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("kernels.disasm"), "s_endpgm\n").expect("write ref");
        let runner =
            MockCommandRunner::new().with_scripted(vec![CommandOutput::success("s_endpgm\n")]);
        let target = TestTarget::new("fir", dir.path(), "fir");

        let outcome = check(&runner, &target, &sample_check());
        assert!(outcome.is_pass());

        let invocations = runner.invocations();
        assert_eq!(invocations[0].args, vec!["kernels.hsaco"]);
    }

    #[test]
    fn test_check_mismatch() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("kernels.disasm"), "s_endpgm\n").expect("write ref");
        let runner =
            MockCommandRunner::new().with_scripted(vec![CommandOutput::success("s_nop\n")]);
        let target = TestTarget::new("fir", dir.path(), "fir");

        let outcome = check(&runner, &target, &sample_check());
        assert!(matches!(outcome, DisasmOutcome::Mismatch { .. }));
    }

    #[test]
    fn test_check_missing_reference_fails() {
        let dir = TempDir::new().expect("tempdir");
        let runner = MockCommandRunner::new();
        let target = TestTarget::new("fir", dir.path(), "fir");

        let outcome = check(&runner, &target, &sample_check());
        assert!(matches!(outcome, DisasmOutcome::Failed { .. }));
    }

    #[test]
    fn test_check_disassembler_failure() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("kernels.disasm"), "x").expect("write ref");
        let runner =
            MockCommandRunner::new().with_scripted(vec![CommandOutput::failure(2, "bad binary")]);
        let target = TestTarget::new("fir", dir.path(), "fir");

        match check(&runner, &target, &sample_check()) {
            DisasmOutcome::Failed { reason } => assert!(reason.contains("2")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
