//! gsim-qa
//!
//! Command-line driver for the acceptance matrix and the determinism
//! verifier. Exit status is the OR of every step: 0 only when the whole
//! session passed.

#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use gsim_qa_cli::{
    build_filter, format_suite_listing, load_suite, run_acceptance, run_determinism,
    write_run_artifacts, FilterOptions, RunOutcome,
};
use gsim_qa_report::ConsoleReporter;
use gsim_qa_runner::{RealCommandRunner, DEFAULT_DETERMINISM_RUNS};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "gsim-qa")]
#[command(about = "Acceptance and determinism harness for simulator benchmarks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every benchmark and run its full acceptance matrix
    Run {
        /// Suite YAML file (defaults to the built-in reference suite)
        #[arg(long)]
        suite: Option<PathBuf>,

        /// Only targets whose name matches this regex
        #[arg(long)]
        benchmark: Option<String>,

        /// Only cells with exactly this many GPUs
        #[arg(long)]
        num_gpus: Option<usize>,

        /// Only parallel cells
        #[arg(long)]
        only_parallel: bool,

        /// Skip parallel cells
        #[arg(long)]
        no_parallel: bool,

        /// Only unified-memory cells
        #[arg(long)]
        only_unified_memory: bool,

        /// Skip unified-memory cells
        #[arg(long)]
        no_unified_memory: bool,

        /// Only unified-GPU cells
        #[arg(long)]
        only_unified_gpu: bool,

        /// Skip unified-GPU cells
        #[arg(long)]
        no_unified_gpu: bool,

        /// Report every cell's command without executing anything
        #[arg(long)]
        dry_run: bool,

        /// Write step records as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write a JUnit XML report to this file
        #[arg(long)]
        junit: Option<PathBuf>,

        /// Write a markdown summary to this file
        #[arg(long)]
        markdown: Option<PathBuf>,
    },

    /// Verify bit-exact metrics across repeated runs
    Deterministic {
        /// Suite YAML file (defaults to the built-in reference suite)
        #[arg(long)]
        suite: Option<PathBuf>,

        /// Repeated runs per target
        #[arg(long, default_value_t = DEFAULT_DETERMINISM_RUNS)]
        runs: usize,

        /// Only targets whose name matches this regex
        #[arg(long)]
        benchmark: Option<String>,

        /// Write step records as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// List a suite's targets and their matrix sizes
    List {
        /// Suite YAML file (defaults to the built-in reference suite)
        #[arg(long)]
        suite: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            suite,
            benchmark,
            num_gpus,
            only_parallel,
            no_parallel,
            only_unified_memory,
            no_unified_memory,
            only_unified_gpu,
            no_unified_gpu,
            dry_run,
            json,
            junit,
            markdown,
        } => {
            let options = FilterOptions {
                benchmark,
                num_gpus,
                only_parallel,
                no_parallel,
                only_unified_memory,
                no_unified_memory,
                only_unified_gpus: only_unified_gpu,
                no_unified_gpus: no_unified_gpu,
            };
            run_command(suite, &options, dry_run, json, junit, markdown)
        }
        Commands::Deterministic {
            suite,
            runs,
            benchmark,
            json,
        } => deterministic_command(suite, runs, benchmark, json),
        Commands::List { suite } => list_command(suite),
    };

    match result {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::FAILURE,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run_command(
    suite_path: Option<PathBuf>,
    options: &FilterOptions,
    dry_run: bool,
    json: Option<PathBuf>,
    junit: Option<PathBuf>,
    markdown: Option<PathBuf>,
) -> Result<bool, String> {
    let suite = load_suite(suite_path.as_deref())?;
    let filter = build_filter(options)?;

    let runner = RealCommandRunner::new();
    let mut reporter = ConsoleReporter::stdout();
    let RunOutcome { failed, records } =
        run_acceptance(&runner, &mut reporter, &suite, filter, dry_run)?;

    write_run_artifacts(
        &suite.name,
        &records,
        json.as_deref(),
        junit.as_deref(),
        markdown.as_deref(),
    )?;
    Ok(failed)
}

fn deterministic_command(
    suite_path: Option<PathBuf>,
    runs: usize,
    benchmark: Option<String>,
    json: Option<PathBuf>,
) -> Result<bool, String> {
    if runs < 2 {
        return Err("--runs must be at least 2 for any comparison to happen".to_string());
    }
    let suite = load_suite(suite_path.as_deref())?;
    let benchmark = match &benchmark {
        Some(pattern) => Some(
            regex::Regex::new(pattern).map_err(|e| format!("invalid --benchmark pattern: {e}"))?,
        ),
        None => None,
    };

    let runner = RealCommandRunner::new();
    let mut reporter = ConsoleReporter::stdout();
    let RunOutcome { failed, records } =
        run_determinism(&runner, &mut reporter, &suite, runs, benchmark.as_ref())?;

    write_run_artifacts(&suite.name, &records, json.as_deref(), None, None)?;
    Ok(failed)
}

fn list_command(suite_path: Option<PathBuf>) -> Result<bool, String> {
    let suite = load_suite(suite_path.as_deref())?;
    print!("{}", format_suite_listing(&suite));
    Ok(false)
}
