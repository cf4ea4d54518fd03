//! ROM image handed over by the acquisition pipeline

use gx_core::HostError;
use std::sync::Arc;

/// Immutable ROM bytes plus the content hash used as save-data identity
#[derive(Debug, Clone)]
pub struct RomImage {
    bytes: Arc<[u8]>,
    hash: String,
}

impl RomImage {
    /// Zero-length images and missing hashes are rejected before configuration
    pub fn new(bytes: impl Into<Arc<[u8]>>, hash: impl Into<String>) -> Result<Self, HostError> {
        let bytes = bytes.into();
        let hash = hash.into();

        if bytes.is_empty() {
            return Err(HostError::InvalidRom("ROM buffer is empty".to_string()));
        }
        if hash.trim().is_empty() {
            return Err(HostError::InvalidRom("ROM content hash is missing".to_string()));
        }

        Ok(Self { bytes, hash })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}
