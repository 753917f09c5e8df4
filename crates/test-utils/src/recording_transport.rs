// crates/test-utils/src/recording_transport.rs

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jobstep_agent::errors::TransportError;
use jobstep_agent::reporter::{BoxFuture, ReportEvent, Transport};

/// One delivered report as the server would have seen it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedReport {
    pub path: String,
    pub fields: BTreeMap<String, Vec<u8>>,
    /// Name and contents of the attached file, if any.
    pub file: Option<(String, Vec<u8>)>,
}

impl RecordedReport {
    pub fn new(path: &str, fields: &[(&str, &str)]) -> Self {
        Self {
            path: path.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                .collect(),
            file: None,
        }
    }

    /// Field value as text, if it is valid UTF-8.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_bytes(key).and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        self.fields.get(key).map(Vec::as_slice)
    }
}

/// A fake transport that:
/// - records every delivered report
/// - optionally fails the first `n` attempts with an HTTP status
/// - optionally sleeps before each attempt.
pub struct RecordingTransport {
    delivered: Arc<Mutex<Vec<RecordedReport>>>,
    attempts: Arc<AtomicUsize>,
    failures_left: AtomicUsize,
    failure_status: u16,
    delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn new(delivered: Arc<Mutex<Vec<RecordedReport>>>) -> Self {
        Self {
            delivered,
            attempts: Arc::new(AtomicUsize::new(0)),
            failures_left: AtomicUsize::new(0),
            failure_status: 503,
            delay: None,
        }
    }

    /// Fail the first `n` delivery attempts with `status`.
    pub fn failing_first(mut self, n: usize, status: u16) -> Self {
        self.failures_left = AtomicUsize::new(n);
        self.failure_status = status;
        self
    }

    /// Sleep before every delivery attempt, to model a slow server.
    pub fn delay_each(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared counter of delivery attempts, including failed ones.
    pub fn attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }
}

impl Transport for RecordingTransport {
    fn deliver<'a>(
        &'a self,
        event: &'a ReportEvent,
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.attempts.fetch_add(1, Ordering::SeqCst);

            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(TransportError::Status(self.failure_status));
            }

            let file = event
                .file
                .as_ref()
                .map(|f| (f.file_name.clone(), f.contents.clone()));

            let report = RecordedReport {
                path: event.path.clone(),
                fields: event.fields.iter().cloned().collect(),
                file,
            };
            self.delivered.lock().unwrap().push(report);
            Ok::<(), TransportError>(())
        })
    }
}
