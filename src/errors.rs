// src/errors.rs

//! Crate-wide error types.
//!
//! `AgentError` covers everything that can go wrong while preparing or
//! executing a job. `TransportError` is kept separate because delivery
//! failures never reach the engine: the reporter's worker logs them and
//! decides whether to retry.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The command could not be turned into a process invocation.
    #[error("cannot construct command '{cmd}': {reason}")]
    Spawn { cmd: String, reason: String },

    /// The OS refused to start the process.
    #[error("failed to launch command '{cmd}': {source}")]
    Launch {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid artifact pattern '{pattern}': {source}")]
    InvalidArtifactPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// A matched artifact could not be read for upload.
    #[error("reading artifact {path:?}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reporter queue is closed")]
    ReporterClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure to deliver one report to the coordination server.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server responded with HTTP {0}")]
    Status(u16),
}

impl TransportError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Connection problems, server errors and rate limiting are transient;
    /// malformed requests and client errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Request(err) => !err.is_builder(),
            TransportError::Status(code) => *code >= 500 || *code == 429,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AgentError>;
