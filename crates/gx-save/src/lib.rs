//! Save data persistence for genplus-host
//!
//! Battery RAM and numbered save-state slots are keyed by the ROM
//! content hash and written to an external [`BlobStore`]. ROMs saved
//! with the old flat layout are migrated the first time they load.

pub mod battery;
pub mod layout;
pub mod manager;
pub mod migration;
pub mod slots;
pub mod store;
pub mod thumbnail;

pub use battery::BatteryTracker;
pub use layout::KeyLayout;
pub use manager::{SaveStateManager, SaveStats, SlotCapture};
pub use migration::LegacyMigrator;
pub use slots::{BlobSlotStore, SlotBundle, SlotInfo, SlotMetadata, SlotStore, MAX_SAVE_SLOTS};
pub use store::{create_store, BlobStore, FsBlobStore, MemoryBlobStore, MemoryStoreStats};
pub use thumbnail::FrameRef;
