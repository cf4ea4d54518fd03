//! Session integration layer for genplus-host
//!
//! Ties the engine bridge, input translation, audio output and save
//! persistence into a running session:
//! - [`PacingLoop`] advances the engine once per display field
//! - [`PauseCoordinator`] suspends and resumes loop and audio together
//! - [`Emulator`] / [`Session`] are the entry points the UI calls

pub mod display;
pub mod loader;
pub mod pacing;
pub mod pause;
pub mod session;

pub use display::{BufferSurface, DisplaySurface, SurfaceSnapshot};
pub use loader::{AppType, RomRequest};
pub use pacing::{FpsCounter, LoopState, PacingLoop, TickOutcome};
pub use pause::{PauseCoordinator, PauseReason, PauseReasons, Resume};
pub use session::{
    Emulator, Session, SessionCommand, SessionEvent, SessionHandle, SessionReport,
};
