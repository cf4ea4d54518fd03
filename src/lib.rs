//! genplus-host
//!
//! Host layer around a precompiled Genesis Plus GX core. The surrounding
//! application picks a ROM, hands the [`Emulator`] a display surface,
//! controllers and an audio sink, and drives the returned [`Session`].
//!
//! ```ignore
//! let config = genplus_host::init()?;
//! let mut emulator = Emulator::new(config.clone());
//! emulator.set_rom("genplusgx-md", &hash, rom_bytes, None, None, 0, false)?;
//! let session = emulator.start(&source, surface, controllers, create_sink(&config.audio)).await?;
//! let (handle, commands) = SessionHandle::channel();
//! let report = session.run(commands, events).await?;
//! ```

pub use gx_audio as audio;
pub use gx_core as core;
pub use gx_engine as engine;
pub use gx_input as input;
pub use gx_integration as integration;
pub use gx_save as save;

pub use gx_audio::{create_sink, AudioSink};
pub use gx_core::{Config, HostError};
pub use gx_engine::{Engine, EngineSource};
pub use gx_input::{Control, ControllerSource, VirtualControllers};
pub use gx_integration::{
    DisplaySurface, Emulator, Session, SessionCommand, SessionEvent, SessionHandle, SessionReport,
};

/// Load the configuration and install logging at its level
pub fn init() -> Result<Config, HostError> {
    let config = Config::load()?;
    gx_core::logging::init(config.debug.log_level);
    tracing::info!("genplus-host {}", env!("CARGO_PKG_VERSION"));
    Ok(config)
}
