use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

use crate::api::Operation;

/// Failure of a single backend round trip.
///
/// Every variant names the operation it came from; the client attaches
/// that context and nothing else.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{operation}: invalid input: {reason}")]
    InvalidInput {
        operation: Operation,
        reason: &'static str,
    },

    #[error("{operation}: request failed: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation}: backend returned {status}: {body}")]
    Status {
        operation: Operation,
        status: StatusCode,
        body: String,
    },

    #[error("{operation}: could not decode response: {source}")]
    Decode {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    pub fn operation(&self) -> Operation {
        match self {
            ClientError::InvalidInput { operation, .. }
            | ClientError::Transport { operation, .. }
            | ClientError::Status { operation, .. }
            | ClientError::Decode { operation, .. } => *operation,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport { source, .. } if source.is_timeout())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}
