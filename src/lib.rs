//! flatstore - a flat-directory HTTP file store.
//!
//! Files are stored, fetched and removed by name through plain HTTP methods
//! with uploads and downloads streamed to and from disk.

pub mod config;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use error::{FlatstoreError, Result};
pub use file::{FileStore, StoreError};
pub use web::WebServer;
