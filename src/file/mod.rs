//! File storage module for flatstore.
//!
//! This module provides the storage core:
//! - Request target sanitizing (flat names only, no traversal)
//! - Streaming uploads and downloads with size limits
//! - Cleanup of partial uploads on every failure path
//! - The `get` / `put` / `delete` store operations

mod error;
pub mod path;
mod service;
pub mod transfer;

pub use error::StoreError;
pub use path::{resolve, validate_name, InvalidPath, NameCheck, Resolved};
pub use service::FileStore;
pub use transfer::{Download, DownloadStream, Termination, Transfer, UploadLimits};

use std::time::Duration;

/// Default maximum upload size (1,000,000 bytes).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 1_000_000;

/// Default download read chunk size (64KB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default wait for the next upload chunk.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
