//! Error types for cdnsync-sync.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use cdnsync_core::{ConfigError, RemoteKey};

/// Pipeline phase a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Detecting,
    Uploading,
    Deleting,
    Refreshing,
    Persisting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Detecting => write!(f, "detect"),
            Phase::Uploading => write!(f, "upload"),
            Phase::Deleting => write!(f, "delete"),
            Phase::Refreshing => write!(f, "refresh"),
            Phase::Persisting => write!(f, "persist"),
        }
    }
}

/// All errors that can arise from a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid options handed to the engine.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A candidate could not be hashed; aborts change detection.
    #[error("failed to hash '{name}' at {path}: {source}")]
    Digest {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two candidates map to the same remote key.
    #[error("'{first}' and '{second}' both map to remote key '{key}'")]
    DuplicateKey {
        key: RemoteKey,
        first: String,
        second: String,
    },

    /// One or more uploads failed. Siblings were allowed to finish.
    #[error("{} upload(s) failed: {}", .failures.len(), join_keys(.failures))]
    Upload { failures: BTreeSet<RemoteKey> },

    /// A batch delete call failed outright.
    #[error("batch delete failed{}: {message}", status_suffix(.status))]
    Delete { status: Option<u16>, message: String },

    /// A CDN refresh call did not report success.
    #[error("cdn refresh failed{}: {message}", status_suffix(.status))]
    Refresh { status: Option<u16>, message: String },

    /// The new cache snapshot could not be written.
    #[error("failed to persist cache: {0}")]
    Persistence(#[source] std::io::Error),

    /// A worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Join(String),
}

impl SyncError {
    /// The pipeline phase this error terminates, if it is a phase error.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            SyncError::Config(_) => None,
            SyncError::Io { .. } | SyncError::Digest { .. } | SyncError::DuplicateKey { .. } => {
                Some(Phase::Detecting)
            }
            SyncError::Upload { .. } => Some(Phase::Uploading),
            SyncError::Delete { .. } => Some(Phase::Deleting),
            SyncError::Refresh { .. } => Some(Phase::Refreshing),
            SyncError::Persistence(_) => Some(Phase::Persisting),
            SyncError::Join(_) => None,
        }
    }
}

/// Failure at the remote service boundary.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection, TLS, or protocol-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call exceeded the configured timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The local file backing an upload could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

fn join_keys(keys: &BTreeSet<RemoteKey>) -> String {
    keys.iter()
        .map(RemoteKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}
