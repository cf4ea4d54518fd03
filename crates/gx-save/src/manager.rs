//! Save state manager
//!
//! Owns everything persisted for one ROM: battery RAM (with legacy
//! migration and write suppression) and numbered save-state slots.
//! Every operation catches its own errors, logs them and reports a
//! plain success flag, so nothing here can stop the pacing loop.

use crate::battery::BatteryTracker;
use crate::layout::{scratch_name, KeyLayout};
use crate::migration::LegacyMigrator;
use crate::slots::{validate_slot, BlobSlotStore, SlotBundle, SlotInfo, SlotMetadata, SlotStore};
use crate::store::BlobStore;
use crate::thumbnail::{self, FrameRef};
use gx_core::SaveError;
use gx_engine::{Engine, HardwareProfile};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Persistence counters, mostly for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveStats {
    pub migrations: u32,
    pub battery_writes: u32,
    pub battery_skips: u32,
    pub slot_saves: u32,
    pub slot_loads: u32,
    pub failures: u32,
}

/// Context captured alongside a save-state
#[derive(Debug, Clone, Copy)]
pub struct SlotCapture<'a> {
    pub profile: HardwareProfile,
    pub frame: u64,
    /// Current display contents, used for the thumbnail
    pub surface: Option<FrameRef<'a>>,
}

pub struct SaveStateManager {
    store: Arc<dyn BlobStore>,
    slots: Arc<dyn SlotStore>,
    layout: KeyLayout,
    hash: String,
    tracker: BatteryTracker,
    migrator: LegacyMigrator,
    stats: SaveStats,
}

impl SaveStateManager {
    /// Manager for the ROM identified by `hash`, with slots kept in the same blob store
    pub fn new(store: Arc<dyn BlobStore>, layout: KeyLayout, hash: impl Into<String>) -> Self {
        let slots = Arc::new(BlobSlotStore::new(Arc::clone(&store), layout.clone()));
        Self::with_slot_store(store, slots, layout, hash)
    }

    pub fn with_slot_store(
        store: Arc<dyn BlobStore>,
        slots: Arc<dyn SlotStore>,
        layout: KeyLayout,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            store,
            slots,
            layout,
            hash: hash.into(),
            tracker: BatteryTracker::new(),
            migrator: LegacyMigrator::new(),
            stats: SaveStats::default(),
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    pub fn stats(&self) -> SaveStats {
        self.stats.clone()
    }

    fn battery_key<E: Engine>(&self) -> String {
        self.layout.battery(&self.hash, scratch_name(E::BATTERY_RAM_FILE))
    }

    fn fail(&mut self, what: &str, err: &SaveError) {
        self.stats.failures += 1;
        tracing::error!("{} failed for {}: {}", what, self.hash, err);
    }

    /// Migrate any legacy record, then hand stored battery RAM to the engine.
    ///
    /// Must run before the engine is reset. Returns `true` if battery RAM
    /// was loaded; `false` leaves the engine at power-on defaults.
    pub async fn load_battery_ram<E: Engine>(&mut self, engine: &mut E) -> bool {
        let key = self.battery_key::<E>();
        let name = scratch_name(E::BATTERY_RAM_FILE);

        match self
            .migrator
            .migrate(self.store.as_ref(), &self.layout, &self.hash, name)
            .await
        {
            Ok(Some(content)) => {
                self.stats.migrations += 1;
                self.tracker.record(&key, &content);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Ignoring legacy save for {}: {}", self.hash, e),
        }

        let content = match self.store.get(&key).await {
            Ok(Some(content)) => content,
            Ok(None) => {
                tracing::debug!("No battery RAM stored at {}", key);
                return false;
            }
            Err(e) => {
                self.fail("Battery RAM read", &e);
                return false;
            }
        };

        engine.write_file(E::BATTERY_RAM_FILE, &content);
        let loaded = engine.load_battery_ram();
        engine.remove_file(E::BATTERY_RAM_FILE);

        if loaded {
            tracing::info!("Loaded {} bytes of battery RAM", content.len());
            self.tracker.record(&key, &content);
        } else {
            tracing::warn!("Engine rejected stored battery RAM for {}", self.hash);
        }
        loaded
    }

    /// Persist the engine's battery RAM unless it matches the last persisted copy.
    ///
    /// Returns `false` only on failure. Games without battery RAM succeed trivially.
    pub async fn save_battery_ram<E: Engine>(&mut self, engine: &mut E) -> bool {
        engine.remove_file(E::BATTERY_RAM_FILE);
        if !engine.save_battery_ram() {
            tracing::trace!("No battery RAM to save");
            return true;
        }

        let Some(content) = engine.read_file(E::BATTERY_RAM_FILE) else {
            self.fail("Battery RAM save", &SaveError::Engine("saveBatteryRAM"));
            return false;
        };
        engine.remove_file(E::BATTERY_RAM_FILE);

        let key = self.battery_key::<E>();
        if !self.tracker.needs_write(&key, &content) {
            self.stats.battery_skips += 1;
            tracing::trace!("Battery RAM unchanged, skipping write");
            return true;
        }

        match self.store.put(&key, &content).await {
            Ok(()) => {
                self.tracker.record(&key, &content);
                self.stats.battery_writes += 1;
                tracing::info!("Saved {} bytes of battery RAM", content.len());
                true
            }
            Err(e) => {
                self.fail("Battery RAM write", &e);
                false
            }
        }
    }

    /// Occupied slots; empty on failure
    pub async fn list_slots(&mut self) -> Vec<SlotInfo> {
        match self.slots.list(&self.hash).await {
            Ok(slots) => slots,
            Err(e) => {
                self.fail("Slot listing", &e);
                Vec::new()
            }
        }
    }

    pub async fn save_slot<E: Engine>(
        &mut self,
        engine: &mut E,
        slot: u32,
        capture: SlotCapture<'_>,
    ) -> bool {
        match self.try_save_slot(engine, slot, capture).await {
            Ok(()) => {
                self.stats.slot_saves += 1;
                tracing::info!("Saved state to slot {}", slot);
                true
            }
            Err(e) => {
                self.fail("Slot save", &e);
                false
            }
        }
    }

    async fn try_save_slot<E: Engine>(
        &mut self,
        engine: &mut E,
        slot: u32,
        capture: SlotCapture<'_>,
    ) -> Result<(), SaveError> {
        validate_slot(slot)?;

        engine.remove_file(E::STATE_FILE);
        if !engine.serialize_state() {
            return Err(SaveError::Engine("serializeState"));
        }
        let state = engine
            .read_file(E::STATE_FILE)
            .ok_or(SaveError::Engine("serializeState"))?;
        engine.remove_file(E::STATE_FILE);

        let thumbnail = match capture.surface {
            Some(frame) => match thumbnail::encode(frame) {
                Ok(png) => Some(png),
                Err(e) => {
                    tracing::warn!("Saving slot {} without thumbnail: {}", slot, e);
                    None
                }
            },
            None => None,
        };

        let meta = SlotMetadata {
            aspect_ratio: capture.profile.aspect_ratio().to_string(),
            hardware: capture.profile.name().to_string(),
            frame: capture.frame,
            created_ms: now_ms(),
            has_thumbnail: thumbnail.is_some(),
        };

        let bundle = SlotBundle {
            state,
            meta,
            thumbnail,
        };
        self.slots.save(&self.hash, slot, &bundle).await
    }

    /// Restore slot `slot`. Returns the restored metadata on success.
    pub async fn load_slot<E: Engine>(&mut self, engine: &mut E, slot: u32) -> Option<SlotMetadata> {
        match self.try_load_slot(engine, slot).await {
            Ok(meta) => {
                self.stats.slot_loads += 1;
                tracing::info!("Loaded state from slot {}", slot);
                Some(meta)
            }
            Err(e) => {
                self.fail("Slot load", &e);
                None
            }
        }
    }

    async fn try_load_slot<E: Engine>(
        &mut self,
        engine: &mut E,
        slot: u32,
    ) -> Result<SlotMetadata, SaveError> {
        let bundle = self
            .slots
            .load(&self.hash, slot)
            .await?
            .ok_or_else(|| SaveError::Store(format!("slot {} is empty", slot)))?;

        engine.write_file(E::STATE_FILE, &bundle.state);
        let restored = engine.deserialize_state();
        engine.remove_file(E::STATE_FILE);

        if restored {
            Ok(bundle.meta)
        } else {
            Err(SaveError::Engine("deserializeState"))
        }
    }

    pub async fn delete_slot(&mut self, slot: u32) -> bool {
        match self.slots.delete(&self.hash, slot).await {
            Ok(()) => {
                tracing::info!("Deleted slot {}", slot);
                true
            }
            Err(e) => {
                self.fail("Slot delete", &e);
                false
            }
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
