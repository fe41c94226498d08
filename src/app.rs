//! Top-level application orchestration.
//!
//! `src/main.rs` only sets up logging and maps errors to exit codes; this module
//! parses arguments and hands a `RunConfig` to the pipeline.

use std::time::Duration;

use clap::Parser;

use crate::cli::{Command, RunArgs};
use crate::domain::RunConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `navsync` binary.
pub fn run() -> Result<(), AppError> {
    // `navsync` and `navsync --dry-run` behave like `navsync run ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => handle_run(&args),
    }
}

fn handle_run(args: &RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(args);
    let outcome = pipeline::run_sync(&config)?;

    println!("{}", crate::report::format_run_summary(&outcome.records));
    if let Some(report) = &outcome.published {
        println!("{}", crate::report::format_publish_report(report));
    }
    Ok(())
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        catalog_dir: args.catalog_dir.clone(),
        dates_file: args.dates_file.clone(),
        workers: args.workers.max(1),
        task_timeout: Duration::from_secs(args.task_timeout_secs.max(1)),
        delete_batch_size: args.delete_batch_size.max(1),
        dry_run: args.dry_run,
    }
}

/// Rewrite argv so `navsync` defaults to `navsync run`.
///
/// Rules:
/// - `navsync`                      -> `navsync run`
/// - `navsync --dry-run ...`        -> `navsync run --dry-run ...`
/// - `navsync --help/--version/-h`  -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version || arg1 == "run" {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
    }
    argv
}
