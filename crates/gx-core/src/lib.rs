//! Core host logic for genplus-host
//!
//! This crate provides the foundational types, error handling,
//! configuration, and logging infrastructure shared by every
//! component that surrounds the emulation core.

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{BridgeError, EngineError, HostError, Result, SaveError};
