//! Bridge to the precompiled emulation core
//!
//! The core itself is opaque: this crate only knows its exported entry
//! points ([`Engine`]), its linear memory ([`LinearMemory`]) and the
//! typed views the host builds on top of that memory ([`MemoryBridge`]).

pub mod bridge;
pub mod engine;
pub mod loader;
pub mod memory;
pub mod rom;
pub mod signals;

#[cfg(any(test, feature = "test-utils"))]
pub mod stub;

pub use bridge::{audio_buffer_len, MemoryBridge, VideoMode};
pub use engine::{ConfigureParams, Engine, HardwareProfile, HostCallbacks, Region};
pub use loader::{CoreLoader, EngineHandle, EngineSource};
pub use memory::LinearMemory;
pub use rom::RomImage;
pub use signals::HostSignals;
