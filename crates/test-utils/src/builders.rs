// crates/test-utils/src/builders.rs

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use jobstep_agent::config::{AgentSection, CmdConfig, ConfigFile, JobConfig, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(job_id: &str) -> Self {
        Self {
            config: RawConfigFile {
                agent: AgentSection {
                    server: "http://127.0.0.1:9".to_string(),
                    ..AgentSection::default()
                },
                job: JobBuilder::new(job_id).build(),
            },
        }
    }

    pub fn with_cmd(mut self, cmd: CmdConfig) -> Self {
        self.config.job.cmds.push(cmd);
        self
    }

    pub fn reporter(mut self, name: &str) -> Self {
        self.config.agent.reporter = name.to_string();
        self
    }

    pub fn log_chunk_size(mut self, size: usize) -> Self {
        self.config.agent.log_chunk_size = size;
        self
    }

    pub fn max_pending_reports(mut self, n: usize) -> Self {
        self.config.agent.max_pending_reports = n;
        self
    }

    pub fn command_timeout_secs(mut self, secs: u64) -> Self {
        self.config.agent.command_timeout_secs = Some(secs);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// Builder for `JobConfig`, for driving the engine directly.
pub struct JobBuilder {
    job: JobConfig,
}

impl JobBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            job: JobConfig {
                id: id.to_string(),
                cmds: Vec::new(),
            },
        }
    }

    pub fn with_cmd(mut self, cmd: CmdConfig) -> Self {
        self.job.cmds.push(cmd);
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}

/// Builder for `CmdConfig`.
pub struct CmdBuilder {
    cmd: CmdConfig,
}

impl CmdBuilder {
    pub fn new(id: &str, script: &str) -> Self {
        Self {
            cmd: CmdConfig {
                id: id.to_string(),
                script: script.to_string(),
                env: BTreeMap::new(),
                cwd: None,
                artifacts: vec![],
            },
        }
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cmd.cwd = Some(dir.into());
        self
    }

    pub fn artifact(mut self, pattern: &str) -> Self {
        self.cmd.artifacts.push(pattern.to_string());
        self
    }

    pub fn build(self) -> CmdConfig {
        self.cmd
    }
}
