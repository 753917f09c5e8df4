// src/reporter/mesos.rs

//! Reporter for agents launched by a cluster scheduler.
//!
//! Identical to the default backend, except that job status reports carry a
//! `node` field naming the host the job ran on.

use std::path::Path;

use tracing::warn;

use crate::errors::Result;
use crate::exec::LogChunk;
use crate::types::{JobResult, Status};

use super::default::{job_status_event, DefaultReporter};
use super::publisher::Publisher;
use super::{BoxFuture, Reporter};

pub struct MesosReporter {
    inner: DefaultReporter,
    node: Option<String>,
}

impl MesosReporter {
    pub fn new(job_id: impl Into<String>, publisher: Publisher) -> Self {
        let node = match hostname::get() {
            Ok(name) => Some(name.to_string_lossy().into_owned()),
            Err(err) => {
                warn!(error = %err, "could not determine hostname; omitting node from reports");
                None
            }
        };
        Self::with_node(job_id, publisher, node)
    }

    fn with_node(job_id: impl Into<String>, publisher: Publisher, node: Option<String>) -> Self {
        Self {
            inner: DefaultReporter::new(job_id, publisher),
            node,
        }
    }
}

impl Reporter for MesosReporter {
    fn push_job_status(&self, status: Status, result: Option<JobResult>) -> BoxFuture<'_, Result<()>> {
        let mut event = job_status_event(self.inner.job_id(), status, result);
        if let Some(node) = &self.node {
            event = event.field("node", node.clone());
        }
        self.inner.publish(event)
    }

    fn push_command_status(
        &self,
        cmd_id: &str,
        status: Status,
        return_code: Option<i32>,
    ) -> BoxFuture<'_, Result<()>> {
        self.inner.push_command_status(cmd_id, status, return_code)
    }

    fn push_log_chunk(&self, chunk: &LogChunk) -> BoxFuture<'_, Result<()>> {
        self.inner.push_log_chunk(chunk)
    }

    fn push_artifact(&self, path: &Path) -> BoxFuture<'_, Result<()>> {
        self.inner.push_artifact(path)
    }

    fn shutdown(self) -> BoxFuture<'static, ()> {
        self.inner.shutdown()
    }
}
