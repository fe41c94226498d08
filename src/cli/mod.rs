//! Command-line parsing for the NAV sync tool.
//!
//! Argument parsing stays here; dispatch lives in `app`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::store::publish::DEFAULT_DELETE_BATCH_SIZE;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "navsync",
    version,
    about = "Sync wealth-product NAV history into a Feishu Bitable table"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch every catalogued product, print a summary and replace the table contents.
    Run(RunArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Directory holding the per-source catalogue files (bocom.txt, cmbc.txt, ...).
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub catalog_dir: PathBuf,

    /// Purchase/redeem date file.
    #[arg(long, value_name = "FILE", default_value = "purchase_dates.txt")]
    pub dates_file: PathBuf,

    /// Products fetched in parallel.
    #[arg(short = 'w', long, default_value_t = 4)]
    pub workers: usize,

    /// Deadline for one product's fetch, in seconds.
    #[arg(long, default_value_t = 15)]
    pub task_timeout_secs: u64,

    /// Rows per batch delete request when clearing the table.
    #[arg(long, default_value_t = DEFAULT_DELETE_BATCH_SIZE)]
    pub delete_batch_size: usize,

    /// Print the summary without publishing.
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults() {
        let cli = Cli::parse_from(["navsync", "run"]);
        let Command::Run(args) = cli.command;
        assert_eq!(args.catalog_dir, PathBuf::from("."));
        assert_eq!(args.dates_file, PathBuf::from("purchase_dates.txt"));
        assert_eq!(args.workers, 4);
        assert_eq!(args.task_timeout_secs, 15);
        assert_eq!(args.delete_batch_size, DEFAULT_DELETE_BATCH_SIZE);
        assert!(!args.dry_run);
    }

    #[test]
    fn run_flags() {
        let cli = Cli::parse_from([
            "navsync",
            "run",
            "--catalog-dir",
            "conf",
            "-w",
            "8",
            "--task-timeout-secs",
            "30",
            "--dry-run",
        ]);
        let Command::Run(args) = cli.command;
        assert_eq!(args.catalog_dir, PathBuf::from("conf"));
        assert_eq!(args.workers, 8);
        assert_eq!(args.task_timeout_secs, 30);
        assert!(args.dry_run);
    }
}
