//! Key-value blob stores

mod fs;
mod memory;

use gx_core::config::{Config, StorageBackend};
use gx_core::SaveError;
use std::sync::Arc;

pub use fs::FsBlobStore;
pub use memory::{MemoryBlobStore, MemoryStoreStats};

#[async_trait::async_trait]
/// External persistence consumed by the save manager.
///
/// Keys are `/`-separated paths. Removing a missing key is not an error.
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SaveError>;

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), SaveError>;

    async fn remove(&self, key: &str) -> Result<(), SaveError>;

    /// Every key starting with `prefix`, sorted
    async fn list(&self, prefix: &str) -> Result<Vec<String>, SaveError>;
}

/// Create the blob store selected by the configuration
pub fn create_store(config: &Config) -> Arc<dyn BlobStore> {
    match config.storage.backend {
        StorageBackend::Filesystem => {
            tracing::info!("Save data directory: {}", config.paths.save_data.display());
            Arc::new(FsBlobStore::new(config.paths.save_data.clone()))
        }
        StorageBackend::Memory => {
            tracing::info!("Using in-memory save storage; nothing will persist");
            Arc::new(MemoryBlobStore::new())
        }
    }
}

/// Reject keys that could escape the store root
pub(crate) fn validate_key(key: &str) -> Result<(), SaveError> {
    let valid = !key.is_empty()
        && !key.contains('\\')
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if valid {
        Ok(())
    } else {
        Err(SaveError::Store(format!("invalid key {:?}", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation_rejects_traversal() {
        for bad in ["", "/abs", "a//b", "a/../b", "..", "a/./b", "a\\b", "trailing/"] {
            assert!(validate_key(bad).is_err(), "{bad:?} should be rejected");
        }
        assert!(validate_key("genplusgx/saves/abc/game.srm").is_ok());
    }

    #[test]
    fn test_memory_backend_from_config() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Memory;
        let store = create_store(&config);
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            store.put("ns/k", b"v").await.unwrap();
            assert_eq!(store.get("ns/k").await.unwrap(), Some(b"v".to_vec()));
        });
    }
}
