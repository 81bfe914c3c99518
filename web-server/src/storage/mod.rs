// web-server/src/storage/mod.rs
//! Keyed blob storage behind the session relay.
//!
//! The relay only ever needs whole-object reads and writes addressed by a
//! string key, so that is all a backend has to provide.

pub mod memory;
pub mod s3;

use async_trait::async_trait;
use session_common::{StorageBackend, StorageConfig};
use std::sync::Arc;
use thiserror::Error;

pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("request for {key} failed: {message}")]
    Request { key: String, message: String },

    #[error("reading body of {key} failed: {message}")]
    Body { key: String, message: String },
}

impl StorageError {
    pub fn request(key: &str, message: impl ToString) -> Self {
        Self::Request { key: key.to_string(), message: message.to_string() }
    }

    pub fn body(key: &str, message: impl ToString) -> Self {
        Self::Body { key: key.to_string(), message: message.to_string() }
    }
}

/// Whole-object store addressed by string key
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch an object; `Ok(None)` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write an object, replacing whatever was there
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StorageError>;

    /// Short label for logs
    fn describe(&self) -> String;
}

/// Build the configured backend. `None` means storage is unavailable and
/// the relay keeps serving health checks only.
pub fn from_config(config: &StorageConfig) -> Option<Arc<dyn BlobStore>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory session storage, contents are lost on restart");
            Some(Arc::new(MemoryBlobStore::new()))
        },
        StorageBackend::S3 => match config.s3_settings() {
            Some(settings) => {
                let store = S3BlobStore::new(&settings);
                tracing::info!("S3 client initialized with bucket {}", settings.bucket);
                Some(Arc::new(store))
            },
            None => {
                tracing::error!(
                    "S3 configuration incomplete. Set storage.endpoint, storage.access_key_id \
                     and storage.secret_access_key"
                );
                None
            }
        },
    }
}
