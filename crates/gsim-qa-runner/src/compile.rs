//! Build stage
//!
//! Invokes the external build collaborator in a target's source
//! directory. One attempt is definitive; the result is a boolean flag,
//! never an error, so a broken build still lets the rest of the matrix
//! surface its own failure signals.

use crate::command::{CommandRunner, OutputMode};
use crate::target::TestTarget;

/// Runs the build collaborator for targets
pub struct BuildStage<'a> {
    runner: &'a dyn CommandRunner,
    command: Vec<String>,
}

impl<'a> BuildStage<'a> {
    /// Create a build stage around a runner and a build command such as
    /// `["go", "build"]`
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, command: Vec<String>) -> Self {
        Self { runner, command }
    }

    /// Build one target in its source directory
    ///
    /// Returns `true` when the build failed, including when the build
    /// collaborator itself could not be started.
    #[must_use]
    pub fn build(&self, target: &TestTarget) -> bool {
        let Some((program, args)) = self.command.split_first() else {
            return true;
        };
        match self
            .runner
            .run(program, args, &target.path, OutputMode::Discard)
        {
            Ok(output) => !output.success,
            Err(_) => true,
        }
    }
}
