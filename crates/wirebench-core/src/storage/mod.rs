//! Storage abstraction for diagram JSON snapshots.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::model::Diagram;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Diagram not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Trait for diagram storage backends.
///
/// Every backend stores whole snapshots; there is no incremental persistence.
pub trait Storage: Send + Sync {
    /// Save a diagram under `id`, replacing any previous snapshot.
    fn save(&self, id: &str, diagram: &Diagram) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a diagram.
    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Diagram>>;

    /// Delete a diagram. Deleting a missing id is not an error.
    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all diagram ids.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    /// Check if a diagram exists.
    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}
