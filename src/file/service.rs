//! File store operations: retrieve, create and remove files by request target.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::body::Bytes;
use futures::Stream;

use super::path::{resolve, Resolved};
use super::transfer::{open_for_download, receive_to_file, Download, UploadLimits};
use super::{StoreError, DEFAULT_CHUNK_SIZE, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_UPLOAD_SIZE};
use crate::config::{FilesConfig, PublicConfig};
use crate::Result;

/// Flat-directory file store.
///
/// Holds only read-only settings, so one instance is shared by every
/// request. All per-request state lives in the transfer it starts.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory holding every stored file.
    root: PathBuf,
    /// Document served for the empty name.
    index_path: PathBuf,
    /// Upload size limit in bytes.
    max_upload_size: u64,
    /// Download read chunk size.
    chunk_size: usize,
    /// Maximum wait for the next upload chunk.
    idle_timeout: Duration,
}

impl FileStore {
    /// Create a new FileStore rooted at `root`.
    ///
    /// The root directory will be created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        Ok(Self {
            index_path: root.join("index.html"),
            root,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        })
    }

    /// Create a FileStore from the loaded configuration.
    pub fn from_config(files: &FilesConfig, public: &PublicConfig) -> Result<Self> {
        Ok(Self::new(files.root_path())?
            .with_index_path(&public.index_path)
            .with_max_upload_size(files.max_upload_size_bytes)
            .with_chunk_size(files.chunk_size)
            .with_idle_timeout(files.idle_timeout()))
    }

    /// Set the index document path.
    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = path.into();
        self
    }

    /// Set the upload size limit in bytes.
    pub fn with_max_upload_size(mut self, bytes: u64) -> Self {
        self.max_upload_size = bytes;
        self
    }

    /// Set the download chunk size in bytes.
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    /// Set the upload idle timeout.
    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = idle;
        self
    }

    /// Get the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the upload size limit in bytes.
    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    /// Resolve a raw request target inside the storage root.
    pub fn resolve(&self, target: &str) -> std::result::Result<Resolved, StoreError> {
        resolve(&self.root, target).map_err(StoreError::from)
    }

    /// Open a stored file (or the index document for `/`) for streaming.
    pub async fn get(&self, target: &str) -> std::result::Result<Download, StoreError> {
        match self.resolve(target)? {
            Resolved::File { name, path } => open_for_download(&path, &name, self.chunk_size).await,
            Resolved::Index => self.index().await,
        }
    }

    async fn index(&self) -> std::result::Result<Download, StoreError> {
        let name = self
            .index_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        // A missing index is a deployment fault, not a client error.
        open_for_download(&self.index_path, &name, self.chunk_size)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => {
                    tracing::error!(path = %self.index_path.display(), "Index document is missing");
                    StoreError::Io(io::Error::new(
                        io::ErrorKind::NotFound,
                        "index document is missing",
                    ))
                }
                other => other,
            })
    }

    /// Store `body` as a new file.
    ///
    /// `declared_len` is the request's `Content-Length`, if it sent one. A
    /// declared length over the limit is refused before any file is created.
    /// Returns the number of bytes stored.
    pub async fn put<S, E>(
        &self,
        target: &str,
        declared_len: Option<u64>,
        body: S,
    ) -> std::result::Result<u64, StoreError>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: fmt::Display,
    {
        let (name, path) = self.file_target(target)?;

        if declared_len.is_some_and(|len| len > self.max_upload_size) {
            tracing::debug!(name = %name, declared_len, "Upload refused by declared length");
            return Err(StoreError::TooLarge {
                limit: self.max_upload_size,
            });
        }

        let limits = UploadLimits {
            max_bytes: self.max_upload_size,
            idle_timeout: self.idle_timeout,
        };
        receive_to_file(&path, &name, body, limits).await
    }

    /// Remove a stored file.
    pub async fn delete(&self, target: &str) -> std::result::Result<(), StoreError> {
        let (name, path) = self.file_target(target)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(name = %name, "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(name)),
            Err(e) => {
                tracing::error!(name = %name, error = %e, "Failed to delete file");
                Err(StoreError::Io(e))
            }
        }
    }

    /// Resolve a target that must name a file; the empty name is invalid.
    fn file_target(&self, target: &str) -> std::result::Result<(String, PathBuf), StoreError> {
        match self.resolve(target)? {
            Resolved::File { name, path } => Ok((name, path)),
            Resolved::Index => Err(StoreError::InvalidPath("empty filename".to_string())),
        }
    }
}
