// web-server/src/storage/memory.rs
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::{BlobStore, StorageError};

/// Process-local blob store
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Seed or overwrite an object directly
    pub fn insert_raw(&self, key: &str, body: impl Into<Vec<u8>>) {
        self.objects.insert(key.to_string(), body.into());
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.objects.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        tracing::trace!("memory store put {} ({} bytes)", key, body.len());
        self.objects.insert(key.to_string(), body);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
