//! Error types for the map server

use livemap_shared::{MarkerId, SessionId};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for synchronization engine operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Reasons an engine operation was refused
///
/// Clients never see these; the transport drops the request silently
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// The session never existed or has timed out
    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    /// The marker never existed or was already removed
    #[error("unknown marker {0}")]
    UnknownMarker(MarkerId),

    /// The session counter is at its maximum
    #[error("session identifiers exhausted")]
    SessionIdsExhausted,

    /// The marker counter is at its maximum
    #[error("marker identifiers exhausted")]
    MarkerIdsExhausted,
}

/// Errors reading or writing the marker snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse snapshot {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors that stop the server from starting or serving
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
