// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [agent]
/// server = "http://coordinator.example/api/0"
/// max_pending_reports = 64
///
/// [job]
/// id = "job_1"
///
/// [[job.cmd]]
/// id = "cmd_1"
/// script = "echo hello"
/// artifacts = ["*.xml"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub agent: AgentSection,

    pub job: JobConfig,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    agent: AgentSection,
    job: JobConfig,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(agent: AgentSection, job: JobConfig) -> Self {
        Self { agent, job }
    }

    pub fn agent(&self) -> &AgentSection {
        &self.agent
    }

    pub fn job(&self) -> &JobConfig {
        &self.job
    }
}

/// `[agent]` section: how to run commands and where to report.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    /// Base URI every report path is appended to.
    #[serde(default)]
    pub server: String,

    /// Name of the reporter backend, looked up in the reporter registry.
    #[serde(default = "default_reporter")]
    pub reporter: String,

    /// Capacity of the reporter queue. Pushing beyond it blocks.
    #[serde(default = "default_max_pending_reports")]
    pub max_pending_reports: usize,

    /// Buffered bytes that trigger a log chunk.
    #[serde(default = "default_log_chunk_size")]
    pub log_chunk_size: usize,

    /// Source label attached to every log chunk.
    #[serde(default = "default_log_source")]
    pub log_source: String,

    #[serde(default)]
    pub command_timeout_secs: Option<u64>,

    /// Interpreter for scripts that carry no `#!` line.
    #[serde(default = "default_shell")]
    pub shell: String,

    #[serde(default)]
    pub retry: RetrySection,
}

pub const DEFAULT_MAX_PENDING_REPORTS: usize = 64;
pub const DEFAULT_LOG_CHUNK_SIZE: usize = 4096;

fn default_reporter() -> String {
    "default".to_string()
}

fn default_max_pending_reports() -> usize {
    DEFAULT_MAX_PENDING_REPORTS
}

fn default_log_chunk_size() -> usize {
    DEFAULT_LOG_CHUNK_SIZE
}

fn default_log_source() -> String {
    "console".to_string()
}

fn default_shell() -> String {
    "sh".to_string()
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            server: String::new(),
            reporter: default_reporter(),
            max_pending_reports: default_max_pending_reports(),
            log_chunk_size: default_log_chunk_size(),
            log_source: default_log_source(),
            command_timeout_secs: None,
            shell: default_shell(),
            retry: RetrySection::default(),
        }
    }
}

impl AgentSection {
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

/// `[agent.retry]` section: delivery retry policy for the reporter.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// Total attempts per report, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// `[job]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub id: String,

    /// Commands in execution order, from `[[job.cmd]]`.
    #[serde(default, rename = "cmd")]
    pub cmds: Vec<CmdConfig>,
}

/// One `[[job.cmd]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CmdConfig {
    pub id: String,

    pub script: String,

    /// Overrides applied on top of the agent's own environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory; unset or empty means the agent's own.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Glob patterns collected after the command succeeds.
    #[serde(default)]
    pub artifacts: Vec<String>,
}

impl CmdConfig {
    /// The configured working directory, ignoring an empty path.
    pub fn effective_cwd(&self) -> Option<&PathBuf> {
        self.cwd.as_ref().filter(|p| !p.as_os_str().is_empty())
    }
}
