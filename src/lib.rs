// src/lib.rs

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod reporter;
pub mod types;

use anyhow::Result;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_from_path};
use crate::config::ConfigFile;
use crate::engine::{Engine, ExecOptions};
use crate::reporter::{build_reporter, HttpTransport, Publisher, PublisherSettings, Reporter, Transport};
use crate::types::JobResult;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading + CLI overrides
/// - the reporter (HTTP transport, queue, backend from the registry)
/// - the engine
///
/// Returns `None` for `--dry-run`, otherwise the job result.
pub async fn run(args: CliArgs) -> Result<Option<JobResult>> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut raw = load_from_path(&config_path)?;
    args.apply_overrides(&mut raw);
    let cfg = ConfigFile::try_from(raw)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(None);
    }

    let transport = HttpTransport::new(cfg.agent().server.clone())?;
    let result = execute_with_transport(&cfg, transport).await?;
    Ok(Some(result))
}

/// Execute a validated job, reporting through `transport`.
///
/// The reporter is shut down (queue drained) before this returns.
pub async fn execute_with_transport<T: Transport>(cfg: &ConfigFile, transport: T) -> Result<JobResult> {
    let publisher = Publisher::spawn(transport, PublisherSettings::from(cfg.agent()));
    let reporter = build_reporter(&cfg.agent().reporter, &cfg.job().id, publisher)?;

    let result = Engine::new(&reporter, ExecOptions::from(cfg.agent()))
        .run(cfg.job())
        .await;

    reporter.shutdown().await;
    info!(job = %cfg.job().id, %result, "all reports delivered");
    Ok(result)
}

/// Simple dry-run output: print agent settings and commands.
fn print_dry_run(cfg: &ConfigFile) {
    let agent = cfg.agent();
    println!("jobstep-agent dry-run");
    println!("  agent.server = {}", agent.server);
    println!("  agent.reporter = {}", agent.reporter);
    println!("  agent.max_pending_reports = {}", agent.max_pending_reports);
    println!("  agent.log_chunk_size = {}", agent.log_chunk_size);
    if let Some(secs) = agent.command_timeout_secs {
        println!("  agent.command_timeout_secs = {secs}");
    }
    println!();

    let job = cfg.job();
    println!("job {} ({} commands):", job.id, job.cmds.len());
    for cmd in job.cmds.iter() {
        println!("  - {}", cmd.id);
        for line in cmd.script.lines() {
            println!("      | {line}");
        }
        if !cmd.env.is_empty() {
            println!("      env: {:?}", cmd.env);
        }
        if let Some(cwd) = cmd.effective_cwd() {
            println!("      cwd: {}", cwd.display());
        }
        if !cmd.artifacts.is_empty() {
            println!("      artifacts: {:?}", cmd.artifacts);
        }
    }
}
