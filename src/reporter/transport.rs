// src/reporter/transport.rs

//! Delivery of a single report to the coordination server.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::errors::{AgentError, Result, TransportError};

use super::{BoxFuture, ReportEvent};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Performs the outbound call for one event.
///
/// The publisher's worker is the only caller, one event at a time. Tests
/// swap in a recording implementation.
pub trait Transport: Send + Sync + 'static {
    fn deliver<'a>(
        &'a self,
        event: &'a ReportEvent,
    ) -> BoxFuture<'a, std::result::Result<(), TransportError>>;
}

/// Multipart form POSTs to `<publish_uri><event.path>`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    publish_uri: String,
}

impl HttpTransport {
    pub fn new(publish_uri: impl Into<String>) -> Result<Self> {
        let publish_uri = publish_uri.into();
        if publish_uri.trim().is_empty() {
            return Err(AgentError::ConfigError(
                "[agent].server must be set to report to a coordination server".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AgentError::Other(e.into()))?;

        debug!(%publish_uri, "constructed HTTP transport");
        Ok(Self {
            client,
            publish_uri: publish_uri.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.publish_uri, path)
    }

    async fn post(&self, event: &ReportEvent) -> std::result::Result<(), TransportError> {
        let url = self.url_for(&event.path);

        let mut form = Form::new();
        for (key, value) in &event.fields {
            form = form.part(key.clone(), Part::bytes(value.clone()));
        }

        if let Some(file) = &event.file {
            form = form.part(
                "file",
                Part::bytes(file.contents.clone()).file_name(file.file_name.clone()),
            );
        }

        debug!(
            %url,
            fields = event.fields.len(),
            file = ?event.file.as_ref().map(|f| &f.file_name),
            "POST"
        );

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(())
    }
}

impl Transport for HttpTransport {
    fn deliver<'a>(
        &'a self,
        event: &'a ReportEvent,
    ) -> BoxFuture<'a, std::result::Result<(), TransportError>> {
        Box::pin(self.post(event))
    }
}
