// src/engine/mod.rs

//! Job execution engine.
//!
//! Runs a job's commands strictly in order, one process at a time:
//!
//! ```text
//! queued → in_progress → finished{passed|failed}
//! ```
//!
//! Each command's output is forwarded to the reporter while the process
//! runs. The first command that cannot be built, cannot be started or exits
//! unsuccessfully ends the job as `failed`; later commands never start.
//! The job's terminal status is reported exactly once, with the final result.

use std::time::Duration;

use crate::config::model::{AgentSection, DEFAULT_LOG_CHUNK_SIZE};

pub mod runtime;

pub use runtime::Engine;

/// Execution knobs taken from `[agent]`.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    pub log_source: String,
    pub log_chunk_size: usize,
    pub shell: String,
    pub command_timeout: Option<Duration>,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            log_source: "console".to_string(),
            log_chunk_size: DEFAULT_LOG_CHUNK_SIZE,
            shell: "sh".to_string(),
            command_timeout: None,
        }
    }
}

impl From<&AgentSection> for ExecOptions {
    fn from(agent: &AgentSection) -> Self {
        Self {
            log_source: agent.log_source.clone(),
            log_chunk_size: agent.log_chunk_size,
            shell: agent.shell.clone(),
            command_timeout: agent.command_timeout(),
        }
    }
}

/// What happened to one command, from the job's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Succeeded,
    Failed,
}
