//! Save-state slots

use crate::layout::{KeyLayout, SLOT_META, SLOT_STATE, SLOT_THUMB};
use crate::store::BlobStore;
use gx_core::SaveError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Slots are numbered `0..MAX_SAVE_SLOTS`
pub const MAX_SAVE_SLOTS: u32 = 10;

pub fn validate_slot(slot: u32) -> Result<(), SaveError> {
    if slot < MAX_SAVE_SLOTS {
        Ok(())
    } else {
        Err(SaveError::InvalidSlot(slot))
    }
}

/// Metadata stored alongside a save-state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotMetadata {
    /// Display aspect ratio, e.g. "1.333"
    pub aspect_ratio: String,
    /// Hardware profile name
    #[serde(default)]
    pub hardware: String,
    /// Frames stepped since boot when the state was taken
    #[serde(default)]
    pub frame: u64,
    /// Unix time in milliseconds
    #[serde(default)]
    pub created_ms: u64,
    #[serde(default)]
    pub has_thumbnail: bool,
}

/// Everything persisted for one slot
#[derive(Debug, Clone, PartialEq)]
pub struct SlotBundle {
    pub state: Vec<u8>,
    pub meta: SlotMetadata,
    pub thumbnail: Option<Vec<u8>>,
}

/// Listing entry for an occupied slot
#[derive(Debug, Clone, PartialEq)]
pub struct SlotInfo {
    pub slot: u32,
    pub meta: SlotMetadata,
}

#[async_trait::async_trait]
/// Persistence of save-state bundles keyed by (ROM hash, slot)
pub trait SlotStore: Send + Sync {
    /// Occupied slots in ascending order
    async fn list(&self, hash: &str) -> Result<Vec<SlotInfo>, SaveError>;

    async fn save(&self, hash: &str, slot: u32, bundle: &SlotBundle) -> Result<(), SaveError>;

    async fn load(&self, hash: &str, slot: u32) -> Result<Option<SlotBundle>, SaveError>;

    async fn delete(&self, hash: &str, slot: u32) -> Result<(), SaveError>;
}

/// [`SlotStore`] laid out as plain blobs in a [`BlobStore`]
pub struct BlobSlotStore {
    store: Arc<dyn BlobStore>,
    layout: KeyLayout,
}

impl BlobSlotStore {
    pub fn new(store: Arc<dyn BlobStore>, layout: KeyLayout) -> Self {
        Self { store, layout }
    }

    async fn read_meta(&self, hash: &str, slot: u32) -> Result<Option<SlotMetadata>, SaveError> {
        let key = self.layout.slot_file(hash, slot, SLOT_META);
        match self.store.get(&key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| SaveError::Metadata(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl SlotStore for BlobSlotStore {
    async fn list(&self, hash: &str) -> Result<Vec<SlotInfo>, SaveError> {
        let keys = self.store.list(&self.layout.slots_dir(hash)).await?;
        let mut slots: Vec<u32> = keys
            .iter()
            .filter_map(|key| self.layout.parse_slot_key(hash, key, SLOT_META))
            .filter(|slot| *slot < MAX_SAVE_SLOTS)
            .collect();
        slots.sort_unstable();
        slots.dedup();

        let mut infos = Vec::with_capacity(slots.len());
        for slot in slots {
            match self.read_meta(hash, slot).await {
                Ok(Some(meta)) => infos.push(SlotInfo { slot, meta }),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping slot {}: {}", slot, e),
            }
        }
        Ok(infos)
    }

    async fn save(&self, hash: &str, slot: u32, bundle: &SlotBundle) -> Result<(), SaveError> {
        validate_slot(slot)?;
        let meta = serde_json::to_vec_pretty(&bundle.meta)
            .map_err(|e| SaveError::Metadata(e.to_string()))?;

        // State first; metadata marks the slot as occupied
        self.store
            .put(&self.layout.slot_file(hash, slot, SLOT_STATE), &bundle.state)
            .await?;

        let thumb_key = self.layout.slot_file(hash, slot, SLOT_THUMB);
        match &bundle.thumbnail {
            Some(png) => self.store.put(&thumb_key, png).await?,
            None => self.store.remove(&thumb_key).await?,
        }

        self.store
            .put(&self.layout.slot_file(hash, slot, SLOT_META), &meta)
            .await
    }

    async fn load(&self, hash: &str, slot: u32) -> Result<Option<SlotBundle>, SaveError> {
        validate_slot(slot)?;
        let Some(meta) = self.read_meta(hash, slot).await? else {
            return Ok(None);
        };

        let state_key = self.layout.slot_file(hash, slot, SLOT_STATE);
        let state = self
            .store
            .get(&state_key)
            .await?
            .ok_or_else(|| SaveError::Store(format!("{} is missing", state_key)))?;

        let thumbnail = if meta.has_thumbnail {
            self.store
                .get(&self.layout.slot_file(hash, slot, SLOT_THUMB))
                .await?
        } else {
            None
        };

        Ok(Some(SlotBundle {
            state,
            meta,
            thumbnail,
        }))
    }

    async fn delete(&self, hash: &str, slot: u32) -> Result<(), SaveError> {
        validate_slot(slot)?;
        for file in [SLOT_META, SLOT_STATE, SLOT_THUMB] {
            self.store.remove(&self.layout.slot_file(hash, slot, file)).await?;
        }
        Ok(())
    }
}
