// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::RawConfigFile;

/// Command-line arguments for `jobstep-agent`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobstep-agent",
    version,
    about = "Run a job's commands and stream their status, logs and artifacts to a coordination server.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the job config file (TOML).
    ///
    /// Default: `jobstep.toml` in the current working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Publish URI of the coordination server (overrides `[agent].server`).
    #[arg(long, value_name = "URI")]
    pub server: Option<String>,

    /// Reporter backend name (overrides `[agent].reporter`).
    #[arg(long, value_name = "NAME")]
    pub reporter: Option<String>,

    /// Capacity of the reporter queue (overrides `[agent].max_pending_reports`).
    #[arg(long, value_name = "N")]
    pub max_pending_reports: Option<usize>,

    /// Bytes buffered before a log chunk is sent (overrides `[agent].log_chunk_size`).
    #[arg(long, value_name = "BYTES")]
    pub log_chunk_size: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBSTEP_AGENT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate and print the job, but don't execute or report anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Apply command-line overrides to a freshly loaded config, before it is
    /// validated.
    pub fn apply_overrides(&self, raw: &mut RawConfigFile) {
        if let Some(server) = &self.server {
            raw.agent.server = server.clone();
        }
        if let Some(reporter) = &self.reporter {
            raw.agent.reporter = reporter.clone();
        }
        if let Some(n) = self.max_pending_reports {
            raw.agent.max_pending_reports = n;
        }
        if let Some(n) = self.log_chunk_size {
            raw.agent.log_chunk_size = n;
        }
    }
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
