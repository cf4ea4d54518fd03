//! Configuration system for genplus-host

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::HostError;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub audio: AudioConfig,
    pub input: InputConfig,
    pub storage: StorageConfig,
    pub paths: PathConfig,
    pub debug: DebugConfig,
}

/// General session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Persist battery RAM whenever the pause menu opens
    pub save_battery_on_pause: bool,
    /// Persist battery RAM when the session stops
    pub save_battery_on_exit: bool,
    /// Suspend the loop while the display surface is hidden
    pub pause_when_hidden: bool,
}

/// Audio settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub backend: AudioBackend,
    pub enable: bool,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    pub volume: f32,
}

/// Audio backend type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum AudioBackend {
    #[default]
    Auto,
    Null,
}

/// Input settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Controls that must all be held to open the pause menu
    pub pause_chord: Vec<String>,
    /// Interval used while waiting for the pause chord to be released
    pub release_poll_ms: u64,
}

/// Save storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Top-level key prefix for every persisted blob
    pub namespace: String,
}

/// Storage backend type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    Filesystem,
    Memory,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub save_data: PathBuf,
}

/// Debug settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub log_level: LogLevel,
    pub show_fps: bool,
}

/// Logging level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            save_battery_on_pause: true,
            save_battery_on_exit: true,
            pause_when_hidden: true,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            backend: AudioBackend::default(),
            enable: true,
            sample_rate: 48_000,
            volume: 1.0,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            pause_chord: vec!["Escape".to_string()],
            release_poll_ms: 16,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            namespace: "genplusgx".to_string(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("genplus-host");

        Self {
            save_data: base.join("saves"),
        }
    }
}

impl Config {
    /// Load configuration from the platform config dir, writing defaults on first run
    pub fn load() -> Result<Self, HostError> {
        let path = Self::config_path();

        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Self::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, HostError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| HostError::Config(e.to_string()))
    }

    /// Save configuration to the platform config dir
    pub fn save(&self) -> Result<(), HostError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<(), HostError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| HostError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("genplus-host")
            .join("config.toml")
    }
}
