// src/engine/runtime.rs

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::artifacts;
use crate::config::model::{CmdConfig, JobConfig};
use crate::errors::Result;
use crate::exec::{ChunkerSettings, CommandRunner, LogChunk};
use crate::fs::RealFileSystem;
use crate::reporter::{BoxFuture, Reporter};
use crate::types::{return_code, JobResult, Status};

use super::{CommandOutcome, ExecOptions};

/// Drives one job through a [`Reporter`].
///
/// The engine never fails: every error is turned into a status report and
/// folded into the job result.
pub struct Engine<'r, R: Reporter> {
    reporter: &'r R,
    options: ExecOptions,
    /// Bytes reported so far for `options.log_source`, across all commands.
    log_offset: u64,
}

impl<'r, R: Reporter> Engine<'r, R> {
    pub fn new(reporter: &'r R, options: ExecOptions) -> Self {
        Self {
            reporter,
            options,
            log_offset: 0,
        }
    }

    /// Run every command of `job` in order and report the outcome.
    pub async fn run(mut self, job: &JobConfig) -> JobResult {
        info!(job = %job.id, commands = job.cmds.len(), "job started");
        queue(
            self.reporter.push_job_status(Status::InProgress, None),
            "job status",
        )
        .await;

        let mut result = JobResult::Passed;
        for (index, cmd) in job.cmds.iter().enumerate() {
            if self.run_command(cmd).await == CommandOutcome::Failed {
                result = JobResult::Failed;
                let skipped = job.cmds.len() - index - 1;
                if skipped > 0 {
                    warn!(job = %job.id, cmd = %cmd.id, skipped, "command failed; skipping remaining commands");
                }
                break;
            }
        }

        queue(
            self.reporter.push_job_status(Status::Finished, Some(result)),
            "job status",
        )
        .await;
        info!(job = %job.id, %result, "job finished");
        result
    }

    async fn run_command(&mut self, cmd: &CmdConfig) -> CommandOutcome {
        let reporter = self.reporter;
        info!(cmd = %cmd.id, "command starting");
        queue(
            reporter.push_command_status(&cmd.id, Status::InProgress, None),
            "command status",
        )
        .await;

        let mut runner = match self.build_runner(cmd) {
            Ok(runner) => runner,
            Err(err) => {
                error!(cmd = %cmd.id, error = %err, "could not construct command");
                return self.finish(cmd, return_code::INFRA_FAILURE).await;
            }
        };

        // The reader is joined together with `run`, so all of this command's
        // chunks are queued before its finished status.
        let chunks = runner.take_chunks();
        let (exit, end_offset) = tokio::join!(
            runner.run(self.options.command_timeout),
            forward_chunks(reporter, chunks)
        );
        if let Some(end) = end_offset {
            self.log_offset = end;
        }

        let exit = match exit {
            Ok(exit) => exit,
            Err(err) => {
                error!(cmd = %cmd.id, error = %err, "could not launch command");
                return self.finish(cmd, return_code::INFRA_FAILURE).await;
            }
        };

        if !exit.success() {
            warn!(
                cmd = %cmd.id,
                exit_code = ?exit.code,
                timed_out = exit.timed_out,
                "command failed"
            );
            return self.finish(cmd, return_code::COMMAND_FAILED).await;
        }

        self.finish(cmd, return_code::SUCCESS).await;

        if let Err(err) = self.publish_artifacts(cmd).await {
            error!(cmd = %cmd.id, error = %err, "artifact collection failed");
            return CommandOutcome::Failed;
        }

        CommandOutcome::Succeeded
    }

    fn build_runner(&self, cmd: &CmdConfig) -> Result<CommandRunner> {
        let settings = ChunkerSettings {
            source: self.options.log_source.clone(),
            threshold: self.options.log_chunk_size,
            start_offset: self.log_offset,
        };
        let mut runner = CommandRunner::new(&cmd.id, &cmd.script, &self.options.shell, settings)?;
        runner.configure(&cmd.env, cmd.effective_cwd().map(PathBuf::as_path))?;
        Ok(runner)
    }

    async fn finish(&self, cmd: &CmdConfig, code: i32) -> CommandOutcome {
        queue(
            self.reporter
                .push_command_status(&cmd.id, Status::Finished, Some(code)),
            "command status",
        )
        .await;

        if code == return_code::SUCCESS {
            CommandOutcome::Succeeded
        } else {
            CommandOutcome::Failed
        }
    }

    async fn publish_artifacts(&self, cmd: &CmdConfig) -> Result<()> {
        if cmd.artifacts.is_empty() {
            debug!(cmd = %cmd.id, "no artifact patterns; skipping collection");
            return Ok(());
        }

        let cwd = match cmd.effective_cwd() {
            Some(dir) => std::path::absolute(dir)?,
            None => std::env::current_dir()?,
        };

        info!(cmd = %cmd.id, patterns = ?cmd.artifacts, "collecting artifacts");
        let matches = artifacts::collect(&RealFileSystem, &cmd.artifacts, &cwd)?;

        // Contents are read while queueing, before the next command can touch them.
        for path in &matches {
            info!(cmd = %cmd.id, artifact = %path.display(), "found artifact");
            self.reporter.push_artifact(path).await?;
        }
        Ok(())
    }
}

/// Forward every chunk to the reporter until the runner closes the channel.
/// Returns the offset just past the last chunk, if there was one.
async fn forward_chunks<R: Reporter>(
    reporter: &R,
    chunks: Option<mpsc::Receiver<LogChunk>>,
) -> Option<u64> {
    let mut rx = chunks?;
    let mut end = None;

    while let Some(chunk) = rx.recv().await {
        debug!(
            source = %chunk.source,
            offset = chunk.offset,
            len = chunk.len(),
            "{}",
            String::from_utf8_lossy(&chunk.payload)
        );
        end = Some(chunk.end_offset());
        queue(reporter.push_log_chunk(&chunk), "log chunk").await;
    }

    end
}

async fn queue(push: BoxFuture<'_, Result<()>>, what: &str) {
    if let Err(err) = push.await {
        warn!(error = %err, "failed to queue {what} report");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_use_console_source() {
        let options = ExecOptions::default();
        assert_eq!(options.log_source, "console");
        assert_eq!(options.log_chunk_size, 4096);
        assert!(options.command_timeout.is_none());
    }
}
