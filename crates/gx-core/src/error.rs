//! Error types for genplus-host

use thiserror::Error;

/// Main error type for the host
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Memory bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Save error: {0}")]
    Save(#[from] SaveError),

    #[error("Invalid ROM: {0}")]
    InvalidRom(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(String),
}

impl HostError {
    /// Fatal errors abort the session through the host's exit path.
    ///
    /// Everything else is recovered where it happened and the session
    /// keeps running.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Engine(_) | Self::InvalidRom(_) => true,
            Self::Bridge(BridgeError::StaleView { .. }) => false,
            Self::Bridge(_) => true,
            Self::Save(_) | Self::Io(_) | Self::Config(_) | Self::Session(_) => false,
        }
    }
}

/// Errors raised while obtaining or driving the emulation engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to load engine: {0}")]
    LoadFailed(String),

    #[error("Failed to initialize engine: {0}")]
    InitFailed(String),

    #[error("Engine aborted: {0}")]
    Aborted(String),

    #[error("Engine could not provide a ROM buffer of {0} bytes")]
    RomBufferUnavailable(usize),
}

/// Errors building or accessing views into engine memory
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("{what} view at 0x{offset:08x}+0x{len:x} exceeds memory of 0x{memory_len:x} bytes")]
    OutOfBounds {
        what: &'static str,
        offset: usize,
        len: usize,
        memory_len: usize,
    },

    #[error("{what} view at 0x{offset:08x} is not aligned to {align}")]
    Misaligned {
        what: &'static str,
        offset: usize,
        align: usize,
    },

    #[error("{what} view is stale (built for generation {built}, memory is at {current})")]
    StaleView {
        what: &'static str,
        built: u64,
        current: u64,
    },
}

/// Persistence errors for battery RAM, migration and save-state slots
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Engine {0} failed")]
    Engine(&'static str),

    #[error("Invalid save slot: {0}")]
    InvalidSlot(u32),
}

/// Result type alias for host operations
pub type Result<T> = std::result::Result<T, HostError>;
