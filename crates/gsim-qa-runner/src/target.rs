//! Benchmark targets and suite definitions
//!
//! A suite is declarative data: each target names a source directory,
//! an executable, fixed size arguments, and the execution axes it opts
//! into. Suites are parsed from YAML or taken from the built-in
//! reference list.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Optional disassembly check for a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisassemblyCheck {
    /// Path to the disassembler executable, relative to the harness cwd
    pub disassembler: PathBuf,
    /// Compiled kernel binary inside the target directory
    pub kernel_binary: String,
    /// Checked-in reference disassembly inside the target directory
    pub reference: String,
}

/// One benchmark under test
///
/// Immutable once registered; created at harness start and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestTarget {
    /// Short name used in reports and filters
    pub name: String,
    /// Source directory; also the working directory for every run
    pub path: PathBuf,
    /// Executable name produced by the build stage
    pub executable: String,
    /// Fixed workload-size arguments, e.g. `-length=8192`
    #[serde(default)]
    pub size_args: Vec<String>,
    /// Exercise discrete and unified multi-device configurations
    #[serde(default)]
    pub multi_device: bool,
    /// Exercise the unified-memory axis
    #[serde(default)]
    pub unified_memory: bool,
    /// Treat serial non-timing discrete-multi-device cells of
    /// unified-memory runs as redundant with single-device coverage
    #[serde(default)]
    pub skip_redundant_discrete: bool,
    /// Optional disassembly check against a reference listing
    #[serde(default)]
    pub disassembly: Option<DisassemblyCheck>,
}

impl TestTarget {
    /// Create a target with no axes opted in
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        executable: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            executable: executable.into(),
            size_args: Vec::new(),
            multi_device: false,
            unified_memory: false,
            skip_redundant_discrete: false,
            disassembly: None,
        }
    }

    /// Set the fixed size arguments
    #[must_use]
    pub fn with_size_args(mut self, args: &[&str]) -> Self {
        self.size_args = args.iter().map(ToString::to_string).collect();
        self
    }

    /// Opt into multi-device configurations
    #[must_use]
    pub fn with_multi_device(mut self) -> Self {
        self.multi_device = true;
        self
    }

    /// Opt into the unified-memory axis
    #[must_use]
    pub fn with_unified_memory(mut self) -> Self {
        self.unified_memory = true;
        self
    }

    /// Mark serial non-timing discrete variants as redundant under
    /// unified memory
    #[must_use]
    pub fn with_skip_redundant_discrete(mut self) -> Self {
        self.skip_redundant_discrete = true;
        self
    }

    /// Attach a disassembly check
    #[must_use]
    pub fn with_disassembly(mut self, check: DisassemblyCheck) -> Self {
        self.disassembly = Some(check);
        self
    }

    /// Re-point an existing target at another directory and executable,
    /// keeping its name and arguments
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>, executable: impl Into<String>) -> Self {
        self.path = path.into();
        self.executable = executable.into();
        self
    }

    /// The program string used to invoke the built executable from its
    /// own directory
    #[must_use]
    pub fn program(&self) -> String {
        format!("./{}", self.executable)
    }
}

fn default_build_command() -> Vec<String> {
    vec!["go".to_string(), "build".to_string()]
}

/// A named collection of targets plus the build collaborator command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    /// Suite name, used in reports
    pub name: String,
    /// Build collaborator invocation, run in each target's directory
    #[serde(default = "default_build_command")]
    pub build_command: Vec<String>,
    /// Acceptance-matrix targets
    pub targets: Vec<TestTarget>,
    /// Targets driven through the determinism verifier
    #[serde(default)]
    pub deterministic: Vec<TestTarget>,
}

impl Suite {
    /// Parse a suite from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or the suite fails
    /// validation.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let suite: Self = serde_yaml::from_str(yaml)?;
        suite.validate()?;
        Ok(suite)
    }

    /// Load a suite from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails parsing or
    /// validation.
    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Validate suite structure: a build command and unique target
    /// names within each section
    ///
    /// # Errors
    ///
    /// Returns [`Error::Suite`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.build_command.is_empty() {
            return Err(Error::Suite("build_command must not be empty".to_string()));
        }
        if self.targets.is_empty() && self.deterministic.is_empty() {
            return Err(Error::Suite("suite defines no targets".to_string()));
        }
        for section in [&self.targets, &self.deterministic] {
            let mut seen = HashSet::new();
            for target in section {
                if target.name.is_empty() {
                    return Err(Error::Suite("target with empty name".to_string()));
                }
                if !seen.insert(target.name.as_str()) {
                    return Err(Error::Suite(format!(
                        "duplicate target name `{}`",
                        target.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// The reference suite: the standard sample benchmarks with their
    /// canonical sizes
    #[must_use]
    pub fn reference() -> Self {
        let samples = "samples";
        let multi = |name: &str, args: &[&str]| {
            TestTarget::new(name, format!("{samples}/{name}"), name)
                .with_size_args(args)
                .with_multi_device()
                .with_unified_memory()
        };
        let single = |name: &str, args: &[&str]| {
            TestTarget::new(name, format!("{samples}/{name}"), name).with_size_args(args)
        };

        Self {
            name: "reference".to_string(),
            build_command: default_build_command(),
            targets: vec![
                multi("fir", &["-length=8192"]),
                multi("matrixmultiplication", &["-x=128", "-y=128", "-z=128"]),
                multi(
                    "kmeans",
                    &["-points=1024", "-features=32", "-clusters=5", "-max-iter=5"],
                ),
                multi("matrixtranspose", &["-width=256"]),
                multi("bitonicsort", &["-length=4096"]),
                multi("aes", &["-length=16384"]),
                multi("simpleconvolution", &[]),
                multi("relu", &[]),
                multi("maxpooling", &[]),
                single("concurrentworkload", &[]),
            ],
            deterministic: vec![
                single("fir-small", &["-length=64"]).with_path("samples/fir", "fir"),
                single("fir-large", &["-length=65536"]).with_path("samples/fir", "fir"),
                single("empty_kernel", &[]),
                single("memcopy", &[]),
            ],
        }
    }
}
