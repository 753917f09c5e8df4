// src/reporter/default.rs

use std::path::Path;

use crate::errors::Result;
use crate::exec::LogChunk;
use crate::types::{JobResult, Status};

use super::publisher::Publisher;
use super::{
    artifacts_path, command_path, job_path, log_path, Attachment, BoxFuture, ReportEvent, Reporter,
};

/// Reporter for the standard coordination-server endpoints.
pub struct DefaultReporter {
    job_id: String,
    publisher: Publisher,
}

impl DefaultReporter {
    pub fn new(job_id: impl Into<String>, publisher: Publisher) -> Self {
        Self {
            job_id: job_id.into(),
            publisher,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Queue an already-built event. Lets other backends add fields to the
    /// standard events and still share this queue.
    pub(crate) fn publish(&self, event: ReportEvent) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.publisher.publish(event))
    }
}

pub(crate) fn job_status_event(job_id: &str, status: Status, result: Option<JobResult>) -> ReportEvent {
    let mut event = ReportEvent::new(job_path(job_id)).field("status", status.as_str());
    if let Some(result) = result {
        event = event.field("result", result.as_str());
    }
    event
}

pub(crate) fn command_status_event(cmd_id: &str, status: Status, return_code: Option<i32>) -> ReportEvent {
    let mut event = ReportEvent::new(command_path(cmd_id)).field("status", status.as_str());
    if let Some(code) = return_code {
        event = event.field("return_code", code.to_string());
    }
    event
}

pub(crate) fn log_chunk_event(job_id: &str, chunk: &LogChunk) -> ReportEvent {
    ReportEvent::new(log_path(job_id))
        .field("source", chunk.source.clone())
        .field("offset", chunk.offset.to_string())
        .field("text", chunk.payload.clone())
}

/// Reads the artifact now, so the event no longer depends on the file.
pub(crate) async fn artifact_event(job_id: &str, path: &Path) -> Result<ReportEvent> {
    let file = Attachment::read(path).await?;
    Ok(ReportEvent::new(artifacts_path(job_id))
        .field("name", path.to_string_lossy().into_owned())
        .with_file(file))
}

impl Reporter for DefaultReporter {
    fn push_job_status(&self, status: Status, result: Option<JobResult>) -> BoxFuture<'_, Result<()>> {
        self.publish(job_status_event(&self.job_id, status, result))
    }

    fn push_command_status(
        &self,
        cmd_id: &str,
        status: Status,
        return_code: Option<i32>,
    ) -> BoxFuture<'_, Result<()>> {
        self.publish(command_status_event(cmd_id, status, return_code))
    }

    fn push_log_chunk(&self, chunk: &LogChunk) -> BoxFuture<'_, Result<()>> {
        self.publish(log_chunk_event(&self.job_id, chunk))
    }

    fn push_artifact(&self, path: &Path) -> BoxFuture<'_, Result<()>> {
        let path = path.to_path_buf();
        Box::pin(async move {
            let event = artifact_event(&self.job_id, &path).await?;
            self.publisher.publish(event).await
        })
    }

    fn shutdown(self) -> BoxFuture<'static, ()> {
        Box::pin(self.publisher.shutdown())
    }
}
