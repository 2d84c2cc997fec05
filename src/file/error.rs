//! Store error taxonomy.

use super::path::InvalidPath;

/// Errors returned by the file store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The request target is not a safe flat filename.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// No stored file with this name.
    #[error("file not found: {0}")]
    NotFound(String),

    /// A stored file with this name already exists.
    #[error("file already exists: {0}")]
    AlreadyExists(String),

    /// Upload declared or streamed more bytes than allowed.
    #[error("file too large (max: {limit} bytes)")]
    TooLarge {
        /// Configured upload limit in bytes.
        limit: u64,
    },

    /// The client went away (or stalled) before the upload finished.
    #[error("client closed the connection")]
    ClientClosed,

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<InvalidPath> for StoreError {
    fn from(err: InvalidPath) -> Self {
        StoreError::InvalidPath(err.0)
    }
}
