// src/cli.rs

//! CLI argument parsing using `clap`.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskchain`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskchain",
    version,
    about = "Compress a per-task execution DAG into a chain DAG.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task graph file (TOML).
    ///
    /// Default: `TaskGraph.toml` in the current working directory.
    #[arg(long, value_name = "PATH")]
    pub graph: Option<PathBuf>,

    /// Cap on merge worker threads; overrides `[config].worker_threads`.
    #[arg(long, value_name = "N")]
    pub threads: Option<NonZeroUsize>,

    /// How to print the resulting chain plan.
    #[arg(long, value_enum, value_name = "FORMAT", default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKCHAIN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task graph per machine, but don't merge.
    #[arg(long)]
    pub dry_run: bool,
}

/// Output format for the chain plan.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
