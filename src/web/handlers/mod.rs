//! API handlers for the file service.

pub mod file;

pub use file::*;

use crate::file::FileStore;

/// Application state shared across handlers.
///
/// Read-only after startup.
#[derive(Debug, Clone)]
pub struct AppState {
    /// File store.
    pub store: FileStore,
}

impl AppState {
    /// Create a new AppState around a file store.
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }
}
