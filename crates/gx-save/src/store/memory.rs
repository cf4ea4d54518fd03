use super::{validate_key, BlobStore};
use gx_core::SaveError;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Operation counters of a [`MemoryBlobStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStoreStats {
    pub gets: u64,
    pub puts: u64,
    pub removes: u64,
}

#[derive(Debug, Default)]
struct Inner {
    blobs: BTreeMap<String, Vec<u8>>,
    stats: MemoryStoreStats,
    fail_writes: bool,
    fail_removes: bool,
}

/// In-process blob store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> MemoryStoreStats {
        self.inner.lock().stats.clone()
    }

    pub fn reset_stats(&self) {
        self.inner.lock().stats = MemoryStoreStats::default();
    }

    /// Make every following put/remove fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Make every following remove fail, leaving puts working
    pub fn set_fail_removes(&self, fail: bool) {
        self.inner.lock().fail_removes = fail;
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().blobs.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().blobs.keys().cloned().collect()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SaveError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        inner.stats.gets += 1;
        Ok(inner.blobs.get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), SaveError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(SaveError::Store(format!("write to {} rejected", key)));
        }
        inner.stats.puts += 1;
        inner.blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SaveError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        if inner.fail_writes || inner.fail_removes {
            return Err(SaveError::Store(format!("remove of {} rejected", key)));
        }
        inner.stats.removes += 1;
        inner.blobs.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, SaveError> {
        let inner = self.inner.lock();
        Ok(inner
            .blobs
            .range(prefix.to_string()..)
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
