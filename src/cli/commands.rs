//! CLI commands and argument parsing

use crate::types::ScheduleMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Paged, batched export of a query result to object storage
#[derive(Parser, Debug)]
#[command(name = "batch-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export the configured query to the destination
    Export {
        /// Destination URL (overrides config)
        /// Supports: /path, memory://, s3://bucket/path, r2://bucket/path, gs://bucket/path, az://container/path
        #[arg(short, long)]
        destination: Option<String>,

        /// Custom query (overrides config)
        #[arg(short, long)]
        query: Option<String>,

        /// Artifact prefix (overrides config)
        #[arg(long)]
        prefix: Option<String>,

        /// Records per batch
        #[arg(long)]
        page_size: Option<usize>,

        /// Worker count in parallel mode
        #[arg(long)]
        concurrency: Option<usize>,

        /// Scheduling mode
        #[arg(long)]
        mode: Option<ModeArg>,

        /// Cancel the run after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Stage payloads as files in this directory instead of memory
        #[arg(long)]
        staging_dir: Option<PathBuf>,
    },

    /// Create the dummy users table and fill it with synthetic rows
    Seed {
        /// Table to create and fill
        #[arg(short, long, default_value = "dummy_users")]
        table: String,

        /// Rows to insert
        #[arg(long, default_value = "100")]
        rows: usize,

        /// Rows per insert statement
        #[arg(long, default_value = "50")]
        batch_size: usize,
    },

    /// Test the source connection and the destination container
    Check,
}

/// Scheduling mode flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    /// One batch at a time
    Sequential,
    /// Bounded worker pool
    Parallel,
}

impl From<ModeArg> for ScheduleMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sequential => ScheduleMode::Sequential,
            ModeArg::Parallel => ScheduleMode::Parallel,
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export_overrides() {
        let cli = Cli::try_parse_from([
            "batch-export",
            "-C",
            "export.yaml",
            "export",
            "--destination",
            "memory://",
            "--page-size",
            "25",
            "--mode",
            "sequential",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("export.yaml")));
        match cli.command {
            Commands::Export {
                destination,
                page_size,
                mode,
                ..
            } => {
                assert_eq!(destination.as_deref(), Some("memory://"));
                assert_eq!(page_size, Some(25));
                assert_eq!(mode.map(ScheduleMode::from), Some(ScheduleMode::Sequential));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_seed_defaults() {
        let cli = Cli::try_parse_from(["batch-export", "seed", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Seed {
                table,
                rows,
                batch_size,
            } => {
                assert_eq!(table, "dummy_users");
                assert_eq!(rows, 100);
                assert_eq!(batch_size, 50);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["batch-export", "export", "--mode", "eager"]).is_err());
    }
}
