// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `jobgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobgraph",
    version,
    about = "Run shell jobs concurrently, in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Config sources: file paths or http(s) URLs. Each is run in turn.
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<String>,

    /// Limit on concurrently running jobs (0 = no limit).
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub max_workers: usize,

    /// Tag every output line with the worker and job that produced it.
    #[arg(long)]
    pub prefix_output: bool,

    /// Load and validate every source and print the execution plan without
    /// running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBGRAPH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
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
