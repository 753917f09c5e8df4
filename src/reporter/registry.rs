// src/reporter/registry.rs

//! Name → backend lookup, resolved once at startup.

use std::path::Path;

use crate::errors::{AgentError, Result};
use crate::exec::LogChunk;
use crate::types::{JobResult, Status};

use super::default::DefaultReporter;
use super::mesos::MesosReporter;
use super::publisher::Publisher;
use super::{BoxFuture, Reporter};

type Constructor = fn(String, Publisher) -> AnyReporter;

const REGISTRY: &[(&str, Constructor)] = &[("default", build_default), ("mesos", build_mesos)];

fn build_default(job_id: String, publisher: Publisher) -> AnyReporter {
    AnyReporter::Default(DefaultReporter::new(job_id, publisher))
}

fn build_mesos(job_id: String, publisher: Publisher) -> AnyReporter {
    AnyReporter::Mesos(MesosReporter::new(job_id, publisher))
}

/// Names of all registered backends.
pub fn names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}

pub fn is_registered(name: &str) -> bool {
    REGISTRY.iter().any(|(n, _)| *n == name)
}

/// Construct the backend registered under `name`, bound to `job_id`.
pub fn build_reporter(name: &str, job_id: &str, publisher: Publisher) -> Result<AnyReporter> {
    let (_, constructor) = REGISTRY
        .iter()
        .find(|(n, _)| *n == name)
        .ok_or_else(|| AgentError::ConfigError(format!("unknown reporter '{name}'")))?;
    Ok(constructor(job_id.to_string(), publisher))
}

/// Any registered backend.
pub enum AnyReporter {
    Default(DefaultReporter),
    Mesos(MesosReporter),
}

impl Reporter for AnyReporter {
    fn push_job_status(&self, status: Status, result: Option<JobResult>) -> BoxFuture<'_, Result<()>> {
        match self {
            AnyReporter::Default(r) => r.push_job_status(status, result),
            AnyReporter::Mesos(r) => r.push_job_status(status, result),
        }
    }

    fn push_command_status(
        &self,
        cmd_id: &str,
        status: Status,
        return_code: Option<i32>,
    ) -> BoxFuture<'_, Result<()>> {
        match self {
            AnyReporter::Default(r) => r.push_command_status(cmd_id, status, return_code),
            AnyReporter::Mesos(r) => r.push_command_status(cmd_id, status, return_code),
        }
    }

    fn push_log_chunk(&self, chunk: &LogChunk) -> BoxFuture<'_, Result<()>> {
        match self {
            AnyReporter::Default(r) => r.push_log_chunk(chunk),
            AnyReporter::Mesos(r) => r.push_log_chunk(chunk),
        }
    }

    fn push_artifact(&self, path: &Path) -> BoxFuture<'_, Result<()>> {
        match self {
            AnyReporter::Default(r) => r.push_artifact(path),
            AnyReporter::Mesos(r) => r.push_artifact(path),
        }
    }

    fn shutdown(self) -> BoxFuture<'static, ()> {
        match self {
            AnyReporter::Default(r) => r.shutdown(),
            AnyReporter::Mesos(r) => r.shutdown(),
        }
    }
}
