//! Subprocess execution abstraction
//!
//! Commands are always structured argument lists, never shell strings,
//! so nothing the harness runs goes through shell quoting. The trait
//! allows executor code to be tested with a scripted mock.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;

/// What to do with the child's output streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Discard stdout and stderr (the default for acceptance runs)
    Discard,
    /// Capture stdout and stderr into the returned output
    Capture,
}

/// Result of executing a command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Captured standard output (empty in discard mode)
    pub stdout: String,
    /// Captured standard error (empty in discard mode)
    pub stderr: String,
    /// Exit code (negative when terminated by a signal)
    pub exit_code: i32,
    /// Whether the command exited zero
    pub success: bool,
}

impl CommandOutput {
    /// Create a successful command output
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
            success: true,
        }
    }

    /// Create a failed command output
    #[must_use]
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
            success: false,
        }
    }
}

/// One recorded invocation, for mock inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program that was invoked
    pub program: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Working directory of the invocation
    pub cwd: PathBuf,
}

/// Trait for synchronous subprocess execution
///
/// A nonzero exit status is a normal, reportable outcome. Only an
/// inability to start the process is an `Err`.
pub trait CommandRunner: Send + Sync {
    /// Spawn `program` with `args` in `cwd`, block until completion,
    /// and return its exit status (plus output in capture mode).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if the process cannot be started
    /// (missing executable, permission denied).
    fn run(&self, program: &str, args: &[String], cwd: &Path, mode: OutputMode)
        -> Result<CommandOutput>;
}

/// Real command runner backed by `std::process`
#[derive(Debug, Clone, Default)]
pub struct RealCommandRunner;

impl RealCommandRunner {
    /// Create a new real command runner
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for RealCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        mode: OutputMode,
    ) -> Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(cwd);

        let spawn_err = |source| Error::Spawn {
            command: format!("{program} {}", args.join(" ")),
            source,
        };

        match mode {
            OutputMode::Discard => {
                let status = cmd
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .map_err(spawn_err)?;
                Ok(CommandOutput {
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: status.code().unwrap_or(-1),
                    success: status.success(),
                })
            }
            OutputMode::Capture => {
                let output = cmd.output().map_err(spawn_err)?;
                Ok(CommandOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    exit_code: output.status.code().unwrap_or(-1),
                    success: output.status.success(),
                })
            }
        }
    }
}

/// Mock command runner for testing
///
/// Records every invocation and answers with scripted exit codes:
/// an explicit per-call queue first, then a fail-list keyed on the
/// program name, then success.
#[derive(Debug, Default)]
pub struct MockCommandRunner {
    scripted: Mutex<Vec<CommandOutput>>,
    fail_programs: Vec<String>,
    invocations: Mutex<Vec<Invocation>>,
}

impl MockCommandRunner {
    /// Create a mock that succeeds on everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every invocation of `program` exit nonzero
    #[must_use]
    pub fn fail_on(mut self, program: impl Into<String>) -> Self {
        self.fail_programs.push(program.into());
        self
    }

    /// Queue outputs to return, in order, before falling back to the
    /// fail-list behavior
    #[must_use]
    pub fn with_scripted(self, outputs: Vec<CommandOutput>) -> Self {
        // Stored reversed so pop() yields them in order
        if let Ok(mut scripted) = self.scripted.lock() {
            *scripted = outputs.into_iter().rev().collect();
        }
        self
    }

    /// All invocations recorded so far
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().map_or_else(|_| Vec::new(), |i| i.clone())
    }
}

impl CommandRunner for MockCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        _mode: OutputMode,
    ) -> Result<CommandOutput> {
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(Invocation {
                program: program.to_string(),
                args: args.to_vec(),
                cwd: cwd.to_path_buf(),
            });
        }

        if let Ok(mut scripted) = self.scripted.lock() {
            if let Some(output) = scripted.pop() {
                return Ok(output);
            }
        }

        if self.fail_programs.iter().any(|p| p == program) {
            return Ok(CommandOutput::failure(1, "scripted failure"));
        }

        Ok(CommandOutput::success(""))
    }
}
