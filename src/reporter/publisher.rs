// src/reporter/publisher.rs

//! Bounded, ordered report queue with a single delivery worker.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{AgentSection, RetrySection};
use crate::errors::{AgentError, Result};

use super::transport::Transport;
use super::ReportEvent;

/// How often, and how patiently, a failed delivery is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay after the `attempt`-th failure (1-based): doubles each time,
    /// capped at `max_backoff`.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetrySection::default())
    }
}

impl From<&RetrySection> for RetryPolicy {
    fn from(section: &RetrySection) -> Self {
        Self {
            max_attempts: section.max_attempts.max(1),
            initial_backoff: Duration::from_millis(section.initial_backoff_ms),
            max_backoff: Duration::from_millis(section.max_backoff_ms),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PublisherSettings {
    /// Queue capacity; pushes beyond it wait for the worker.
    pub capacity: usize,
    pub retry: RetryPolicy,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        PublisherSettings::from(&AgentSection::default())
    }
}

impl From<&AgentSection> for PublisherSettings {
    fn from(agent: &AgentSection) -> Self {
        Self {
            capacity: agent.max_pending_reports,
            retry: RetryPolicy::from(&agent.retry),
        }
    }
}

/// Queue front-end plus the worker draining it.
pub struct Publisher {
    tx: mpsc::Sender<ReportEvent>,
    worker: JoinHandle<()>,
}

impl Publisher {
    /// Create the queue and spawn its worker on the current Tokio runtime.
    pub fn spawn<T: Transport>(transport: T, settings: PublisherSettings) -> Self {
        let capacity = settings.capacity.max(1);
        info!(capacity, max_attempts = settings.retry.max_attempts, "starting reporter");

        let (tx, rx) = mpsc::channel::<ReportEvent>(capacity);
        let worker = tokio::spawn(deliver_loop(transport, rx, settings.retry));

        Self { tx, worker }
    }

    /// Enqueue an event, waiting while the queue is full.
    pub async fn publish(&self, event: ReportEvent) -> Result<()> {
        debug!(path = %event.path, "queueing report");
        self.tx
            .send(event)
            .await
            .map_err(|_| AgentError::ReporterClosed)
    }

    /// Stop accepting events, deliver everything still queued, then return.
    pub async fn shutdown(self) {
        info!("reporter shutting down; draining queue");
        drop(self.tx);
        if let Err(err) = self.worker.await {
            error!(error = %err, "reporter worker terminated abnormally");
        }
    }
}

async fn deliver_loop<T: Transport>(
    transport: T,
    mut rx: mpsc::Receiver<ReportEvent>,
    retry: RetryPolicy,
) {
    info!("reporter worker started");

    let mut delivered = 0u64;
    let mut abandoned = 0u64;

    while let Some(event) = rx.recv().await {
        if deliver_with_retry(&transport, &event, &retry).await {
            delivered += 1;
        } else {
            abandoned += 1;
        }
    }

    info!(delivered, abandoned, "reporter worker finished (queue closed)");
}

/// Deliver one event. The next event is not touched until this returns, so
/// retries never reorder the stream.
async fn deliver_with_retry<T: Transport>(
    transport: &T,
    event: &ReportEvent,
    retry: &RetryPolicy,
) -> bool {
    let mut attempt = 1;

    loop {
        match transport.deliver(event).await {
            Ok(()) => {
                debug!(path = %event.path, attempt, "report delivered");
                return true;
            }
            Err(err) if err.is_retryable() && attempt < retry.max_attempts => {
                let backoff = retry.backoff_after(attempt);
                warn!(
                    path = %event.path,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "report delivery failed; retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(err) => {
                error!(path = %event.path, attempt, error = %err, "report delivery failed; giving up");
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
        };
        assert_eq!(policy.backoff_after(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_after(40), Duration::from_millis(350));
    }

    #[test]
    fn settings_follow_agent_section() {
        let settings = PublisherSettings::default();
        assert_eq!(settings.capacity, 64);
        assert_eq!(settings.retry.max_attempts, 3);
    }
}
