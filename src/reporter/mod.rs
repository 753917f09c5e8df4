// src/reporter/mod.rs

//! Outbound status/log/artifact reporting.
//!
//! Every backend implements [`Reporter`] and routes its events through one
//! [`Publisher`]: a bounded FIFO queue drained by a single worker that hands
//! each event to a [`Transport`]. Pushing into a full queue waits, so events
//! are never dropped or reordered on the way to the server.
//!
//! - [`publisher`] owns the queue, the worker and the retry policy.
//! - [`transport`] defines `Transport` and the HTTP implementation.
//! - [`default`] and [`mesos`] are the backends.
//! - [`registry`] maps backend names to constructors.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::errors::{AgentError, Result};
use crate::exec::LogChunk;
use crate::types::{JobResult, Status};

pub mod default;
pub mod mesos;
pub mod publisher;
pub mod registry;
pub mod transport;

pub use default::DefaultReporter;
pub use mesos::MesosReporter;
pub use publisher::{Publisher, PublisherSettings, RetryPolicy};
pub use registry::{build_reporter, AnyReporter};
pub use transport::{HttpTransport, Transport};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One outbound call: a path below the publish URI and its form data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEvent {
    pub path: String,
    /// Form fields in insertion order. Values are sent as raw bytes, so log
    /// text reaches the server exactly as the command wrote it.
    pub fields: Vec<(String, Vec<u8>)>,
    /// File attached to the form under the `file` field.
    pub file: Option<Attachment>,
}

impl ReportEvent {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            fields: Vec::new(),
            file: None,
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn with_file(mut self, file: Attachment) -> Self {
        self.file = Some(file);
        self
    }

    /// Raw value of the first field named `key`.
    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Value of the first field named `key`, if it is valid UTF-8.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_bytes(key).and_then(|v| std::str::from_utf8(v).ok())
    }
}

/// File contents captured when the report is queued.
///
/// The queue owns the bytes from then on; later commands may rewrite or
/// delete the file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl Attachment {
    pub async fn read(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read(path)
            .await
            .map_err(|source| AgentError::Artifact {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        Ok(Self {
            file_name,
            contents,
        })
    }
}

pub fn job_path(job_id: &str) -> String {
    format!("/jobsteps/{job_id}/")
}

pub fn command_path(cmd_id: &str) -> String {
    format!("/commands/{cmd_id}/")
}

pub fn log_path(job_id: &str) -> String {
    format!("{}logappend/", job_path(job_id))
}

pub fn artifacts_path(job_id: &str) -> String {
    format!("{}artifacts/", job_path(job_id))
}

/// Capabilities every reporter backend provides.
///
/// A reporter is bound to one job. Push methods resolve once the event is in
/// the queue, not when it reaches the server; an error means the queue is
/// gone, or for `push_artifact`, that the file could not be read.
/// `shutdown` consumes the reporter, drains the queue and waits for the last
/// delivery.
pub trait Reporter: Send + Sync {
    fn push_job_status(&self, status: Status, result: Option<JobResult>) -> BoxFuture<'_, Result<()>>;

    /// `return_code` is omitted from the report while unknown.
    fn push_command_status(
        &self,
        cmd_id: &str,
        status: Status,
        return_code: Option<i32>,
    ) -> BoxFuture<'_, Result<()>>;

    fn push_log_chunk(&self, chunk: &LogChunk) -> BoxFuture<'_, Result<()>>;

    fn push_artifact(&self, path: &Path) -> BoxFuture<'_, Result<()>>;

    fn shutdown(self) -> BoxFuture<'static, ()>
    where
        Self: Sized;
}
