// src/exec/runner.rs

//! Single-command process runner.

use std::collections::BTreeMap;
use std::io::{BufReader, Write};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempPath;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{AgentError, Result};

use super::chunker::{Chunker, ChunkerSettings};
use super::{ExitState, LogChunk};

const CHUNK_CHANNEL_CAPACITY: usize = 16;

/// Owns one subprocess from construction until exit.
///
/// The chunk receiver is available right after [`CommandRunner::new`], so a
/// consumer can start draining before [`CommandRunner::run`] is called. The
/// sending side is dropped before `run` returns.
pub struct CommandRunner {
    id: String,
    command: Command,
    script: TempPath,
    chunker: ChunkerSettings,
    chunk_tx: mpsc::Sender<LogChunk>,
    chunk_rx: Option<mpsc::Receiver<LogChunk>>,
}

impl CommandRunner {
    /// Write `script` to a temporary file and prepare its invocation.
    ///
    /// A leading `#!` line selects the interpreter; otherwise `shell` is used.
    pub fn new(id: &str, script: &str, shell: &str, chunker: ChunkerSettings) -> Result<Self> {
        let spawn_error = |reason: &str| AgentError::Spawn {
            cmd: id.to_string(),
            reason: reason.to_string(),
        };

        if script.contains('\0') {
            return Err(spawn_error("script contains a NUL byte"));
        }

        let (program, args) =
            interpreter_for(script, shell).ok_or_else(|| spawn_error("no interpreter to run the script"))?;

        let script_path = write_script(script)
            .map_err(|e| spawn_error(&format!("writing script file: {e}")))?;

        let mut command = Command::new(&program);
        command
            .args(&args)
            .arg(&script_path)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        // Own process group, so a deadline can take down the whole tree.
        #[cfg(unix)]
        command.process_group(0);

        debug!(cmd = %id, %program, ?args, script = %script_path.display(), "prepared command");

        let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);

        Ok(Self {
            id: id.to_string(),
            command,
            script: script_path,
            chunker,
            chunk_tx,
            chunk_rx: Some(chunk_rx),
        })
    }

    /// Apply environment overrides (on top of the inherited environment) and
    /// the working directory.
    pub fn configure(&mut self, env: &BTreeMap<String, String>, cwd: Option<&Path>) -> Result<()> {
        for (key, value) in env {
            if key.is_empty() || key.contains('=') || key.contains('\0') || value.contains('\0') {
                return Err(AgentError::Spawn {
                    cmd: self.id.clone(),
                    reason: format!("invalid environment variable {key:?}"),
                });
            }
        }

        self.command.envs(env);
        if let Some(dir) = cwd {
            self.command.current_dir(dir);
        }
        Ok(())
    }

    /// Hand out the chunk receiver. Returns `None` on the second call.
    pub fn take_chunks(&mut self) -> Option<mpsc::Receiver<LogChunk>> {
        self.chunk_rx.take()
    }

    /// Start the process and wait for it to exit.
    ///
    /// Stdout and stderr share one pipe, read on a blocking thread through a
    /// [`Chunker`]. The reader thread is joined before this returns, which
    /// closes the chunk channel.
    pub async fn run(self, timeout: Option<Duration>) -> Result<ExitState> {
        let Self {
            id,
            mut command,
            script,
            chunker,
            chunk_tx,
            ..
        } = self;

        let launch_error = |source: std::io::Error| AgentError::Launch {
            cmd: id.clone(),
            source,
        };

        let (reader, writer) = std::io::pipe().map_err(launch_error)?;
        let writer_for_stderr = writer.try_clone().map_err(launch_error)?;
        command.stdout(writer).stderr(writer_for_stderr);

        let spawned = command.spawn();
        // `command` still holds the write ends; EOF only arrives once they are gone.
        drop(command);
        let mut child = spawned.map_err(launch_error)?;

        info!(cmd = %id, pid = ?child.id(), "command started");

        let reader_cmd = id.clone();
        let reader_task = tokio::task::spawn_blocking(move || {
            let mut chunks = Chunker::new(BufReader::new(reader), &chunker);
            let mut receiver_gone = false;

            for chunk in chunks.by_ref() {
                match chunk {
                    Ok(chunk) => {
                        // Keep draining even without a receiver so the child never blocks.
                        if !receiver_gone && chunk_tx.blocking_send(chunk).is_err() {
                            debug!(cmd = %reader_cmd, "chunk receiver dropped; discarding output");
                            receiver_gone = true;
                        }
                    }
                    Err(err) => {
                        warn!(cmd = %reader_cmd, error = %err, "reading command output failed");
                        break;
                    }
                }
            }

            chunks.offset()
        });

        let waited = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status.map(ExitState::from),
                Err(_) => {
                    warn!(cmd = %id, timeout_secs = limit.as_secs_f64(), "command deadline elapsed; killing process");
                    terminate(&mut child, &id).await;
                    Ok(ExitState {
                        code: None,
                        timed_out: true,
                    })
                }
            },
            None => child.wait().await.map(ExitState::from),
        };

        if let Err(err) = &waited {
            // No status means the child may still be holding the pipe open.
            warn!(cmd = %id, error = %err, "waiting for command failed; killing process");
            terminate(&mut child, &id).await;
        }

        // Joined on every path, so the chunk channel is closed once we return.
        match reader_task.await {
            Ok(end_offset) => debug!(cmd = %id, end_offset, "output reader finished"),
            Err(err) => warn!(cmd = %id, error = %err, "output reader task failed"),
        }

        let exit = waited.map_err(launch_error)?;

        info!(
            cmd = %id,
            exit_code = ?exit.code,
            success = exit.success(),
            timed_out = exit.timed_out,
            "command exited"
        );

        drop(script);
        Ok(exit)
    }
}

impl From<std::process::ExitStatus> for ExitState {
    fn from(status: std::process::ExitStatus) -> Self {
        ExitState {
            code: status.code(),
            timed_out: false,
        }
    }
}

/// Kill the child and everything in its process group.
async fn terminate(child: &mut Child, id: &str) {
    if let Some(pid) = child.id() {
        if let Err(err) = kill_process_group(pid) {
            debug!(cmd = %id, error = %err, "failed to signal process group");
        }
    }
    if let Err(err) = child.kill().await {
        warn!(cmd = %id, error = %err, "failed to kill process");
    }
}

/// SIGKILL the process group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) -> std::io::Result<()> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pid = i32::try_from(pid).map_err(std::io::Error::other)?;
    killpg(Pid::from_raw(pid), Signal::SIGKILL).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) -> std::io::Result<()> {
    Ok(())
}

/// Interpreter program and leading arguments for `script`.
fn interpreter_for(script: &str, shell: &str) -> Option<(String, Vec<String>)> {
    let line = match script.strip_prefix("#!") {
        Some(rest) => rest.lines().next().unwrap_or(""),
        None => shell,
    };

    let mut parts = line.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

fn write_script(script: &str) -> std::io::Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix("jobstep-")
        .suffix(".script")
        .tempfile()?;
    file.write_all(script.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}
