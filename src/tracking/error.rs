// ABOUTME: Error types for source tracking.
// ABOUTME: Lock contention, store I/O, corrupt state, and remote query failures.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

use crate::components::ResolveError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("tracking store is locked by {holder} (pid {pid}) since {started_at}")]
    LockHeld {
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
    },

    #[error("tracking lock error: {0}")]
    Lock(String),

    #[error("tracking store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("tracking store at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to scan local source: {0}")]
    Local(#[from] ResolveError),

    #[error("failed to query remote changes: {0}")]
    Remote(#[from] TransportError),
}

impl TrackingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrackingError::Io {
            path: path.into(),
            source,
        }
    }
}
