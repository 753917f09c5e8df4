// src/config/validate.rs

use std::collections::HashSet;

use crate::artifacts::compile_pattern;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AgentError, Result};
use crate::reporter::registry;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AgentError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.agent, raw.job))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_agent(cfg)?;
    validate_job_identity(cfg)?;
    validate_artifact_patterns(cfg)?;
    Ok(())
}

fn validate_agent(cfg: &RawConfigFile) -> Result<()> {
    let agent = &cfg.agent;

    if agent.max_pending_reports == 0 {
        return Err(AgentError::ConfigError(
            "[agent].max_pending_reports must be >= 1 (got 0)".to_string(),
        ));
    }

    if agent.log_chunk_size == 0 {
        return Err(AgentError::ConfigError(
            "[agent].log_chunk_size must be >= 1 (got 0)".to_string(),
        ));
    }

    if agent.retry.max_attempts == 0 {
        return Err(AgentError::ConfigError(
            "[agent.retry].max_attempts must be >= 1 (got 0)".to_string(),
        ));
    }

    if agent.shell.trim().is_empty() {
        return Err(AgentError::ConfigError(
            "[agent].shell must not be empty".to_string(),
        ));
    }

    if !registry::is_registered(&agent.reporter) {
        let known: Vec<_> = registry::names().collect();
        return Err(AgentError::ConfigError(format!(
            "unknown reporter '{}' (known: {})",
            agent.reporter,
            known.join(", ")
        )));
    }

    Ok(())
}

fn validate_job_identity(cfg: &RawConfigFile) -> Result<()> {
    if cfg.job.id.trim().is_empty() {
        return Err(AgentError::ConfigError(
            "[job].id must not be empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for (index, cmd) in cfg.job.cmds.iter().enumerate() {
        if cmd.id.trim().is_empty() {
            return Err(AgentError::ConfigError(format!(
                "command #{} has an empty id",
                index + 1
            )));
        }
        if !seen.insert(cmd.id.as_str()) {
            return Err(AgentError::ConfigError(format!(
                "duplicate command id '{}'",
                cmd.id
            )));
        }
    }
    Ok(())
}

fn validate_artifact_patterns(cfg: &RawConfigFile) -> Result<()> {
    for cmd in cfg.job.cmds.iter() {
        for pattern in cmd.artifacts.iter() {
            compile_pattern(pattern)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::load_from_str;

    fn parse(toml: &str) -> Result<ConfigFile> {
        ConfigFile::try_from(load_from_str(toml)?)
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = parse(
            r#"
[job]
id = "job_1"

[[job.cmd]]
id = "cmd_1"
script = "echo hi"
"#,
        )
        .unwrap();

        assert_eq!(cfg.agent().max_pending_reports, 64);
        assert_eq!(cfg.agent().log_chunk_size, 4096);
        assert_eq!(cfg.agent().log_source, "console");
        assert_eq!(cfg.agent().reporter, "default");
        assert_eq!(cfg.job().cmds.len(), 1);
        assert!(cfg.job().cmds[0].artifacts.is_empty());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = parse(
            r#"
[agent]
log_chunk_size = 0

[job]
id = "job_1"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::ConfigError(msg) if msg.contains("log_chunk_size")));
    }

    #[test]
    fn duplicate_command_ids_are_rejected() {
        let err = parse(
            r#"
[job]
id = "job_1"

[[job.cmd]]
id = "build"
script = "true"

[[job.cmd]]
id = "build"
script = "true"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::ConfigError(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn unknown_reporter_is_rejected() {
        let err = parse(
            r#"
[agent]
reporter = "carrier-pigeon"

[job]
id = "job_1"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::ConfigError(msg) if msg.contains("carrier-pigeon")));
    }
}
