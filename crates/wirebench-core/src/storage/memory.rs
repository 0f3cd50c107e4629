//! In-memory storage implementation.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::model::Diagram;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    diagrams: RwLock<HashMap<String, Diagram>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, diagram: &Diagram) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let diagram = diagram.clone();
        Box::pin(async move {
            let mut diagrams = self.diagrams.write().map_err(lock_error)?;
            diagrams.insert(id, diagram);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Diagram>> {
        let id = id.to_string();
        Box::pin(async move {
            let diagrams = self.diagrams.read().map_err(lock_error)?;
            diagrams
                .get(&id)
                .cloned()
                .ok_or(StorageError::NotFound(id))
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut diagrams = self.diagrams.write().map_err(lock_error)?;
            diagrams.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let diagrams = self.diagrams.read().map_err(lock_error)?;
            let mut ids: Vec<String> = diagrams.keys().cloned().collect();
            ids.sort();
            Ok(ids)
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move {
            let diagrams = self.diagrams.read().map_err(lock_error)?;
            Ok(diagrams.contains_key(&id))
        })
    }
}
