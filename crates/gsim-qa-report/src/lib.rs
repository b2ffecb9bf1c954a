//! Reporting surfaces for the acceptance harness
//!
//! Takes the step records produced by `gsim-qa-runner` and renders them
//! for humans and CI: a colored console stream, a JUnit XML document,
//! and a markdown session summary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod console;
pub mod error;
pub mod junit;
pub mod markdown;

pub use console::ConsoleReporter;
pub use error::{Error, Result};
pub use junit::JunitReport;
pub use markdown::generate_markdown;
