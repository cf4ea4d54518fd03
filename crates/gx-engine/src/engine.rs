//! Entry points exported by the emulation core
//!
//! Signatures are fixed by the compiled core. Codes passed to
//! `configure` and the scratch-file paths are part of that contract and
//! have to be adapted if a different core is substituted.

use crate::memory::LinearMemory;
use gx_core::EngineError;

/// Hardware profile selected at configuration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HardwareProfile {
    /// Mega Drive / Genesis
    MegaDrive,
    /// Master System (first revision)
    MasterSystem,
    /// Master System II
    MasterSystem2,
    /// Game Gear
    GameGear,
    /// SG-1000
    Sg1000,
}

impl HardwareProfile {
    pub const ALL: [HardwareProfile; 5] = [
        Self::MegaDrive,
        Self::MasterSystem,
        Self::MasterSystem2,
        Self::GameGear,
        Self::Sg1000,
    ];

    /// Code understood by the core's `configure` entry point
    pub fn code(self) -> i32 {
        match self {
            Self::MegaDrive => 0,
            Self::MasterSystem => 1,
            Self::MasterSystem2 => 2,
            Self::GameGear => 3,
            Self::Sg1000 => 4,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }

    /// Display aspect ratio recorded with save-state slots
    pub fn aspect_ratio(self) -> &'static str {
        match self {
            Self::GameGear => "1.111",
            _ => "1.333",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MegaDrive => "Mega Drive",
            Self::MasterSystem => "Master System",
            Self::MasterSystem2 => "Master System II",
            Self::GameGear => "Game Gear",
            Self::Sg1000 => "SG-1000",
        }
    }
}

/// Forced video region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Region {
    /// Let the core detect the region from the ROM header
    #[default]
    Auto,
    Ntsc,
    Pal,
}

impl Region {
    pub fn code(self) -> i32 {
        match self {
            Self::Auto => 0,
            Self::Ntsc => 1,
            Self::Pal => 2,
        }
    }

    /// Map an optional "force PAL" flag (absent = auto-detect)
    pub fn from_pal_flag(pal: Option<bool>) -> Self {
        match pal {
            None => Self::Auto,
            Some(true) => Self::Pal,
            Some(false) => Self::Ntsc,
        }
    }
}

/// Parameters for the core's `configure` entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureParams {
    pub profile: HardwareProfile,
    pub region: Region,
    /// FM sound chip (YM2413) enable; `None` lets the core decide
    pub fm_chip: Option<bool>,
    /// Force a 3-button pad instead of the 6-button default
    pub force_three_button: bool,
}

impl ConfigureParams {
    pub fn new(profile: HardwareProfile) -> Self {
        Self {
            profile,
            region: Region::Auto,
            fm_chip: None,
            force_three_button: false,
        }
    }

    pub fn fm_chip_code(&self) -> i32 {
        match self.fm_chip {
            None => -1,
            Some(false) => 0,
            Some(true) => 1,
        }
    }
}

/// Invoked by the core once native output dimensions are known
pub type ResizeCallback = Box<dyn FnMut(u32, u32) + Send>;

/// Invoked by the core when it hits a fatal condition
pub type AbortCallback = Box<dyn FnMut(&str) + Send>;

/// Callbacks registered on an engine instance at load time
pub struct HostCallbacks {
    pub on_resize: ResizeCallback,
    pub on_abort: AbortCallback,
}

impl std::fmt::Debug for HostCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCallbacks").finish_non_exhaustive()
    }
}

/// Exported function table of the emulation core
pub trait Engine {
    /// Scratch file the core reads/writes battery RAM through
    const BATTERY_RAM_FILE: &'static str = "/tmp/game.srm";

    /// Scratch file the core reads/writes full-state snapshots through
    const STATE_FILE: &'static str = "/tmp/game.state";

    fn set_host_callbacks(&mut self, callbacks: HostCallbacks);

    /// Allocate engine memory
    fn init(&mut self) -> Result<(), EngineError>;

    /// Configure hardware after the ROM has been copied in
    fn configure(&mut self, params: &ConfigureParams) -> Result<(), EngineError>;

    fn reset(&mut self);

    /// Advance one display field. Indivisible.
    fn step(&mut self);

    /// Number of audio samples per channel produced by the last step
    fn sound(&mut self) -> usize;

    fn is_pal(&self) -> bool;

    /// Offset of a ROM buffer able to hold `len` bytes (may reallocate memory)
    fn rom_buffer_ref(&mut self, len: usize) -> Result<usize, EngineError>;

    fn frame_buffer_ref(&self) -> usize;

    fn audio_left_ref(&self) -> usize;

    fn audio_right_ref(&self) -> usize;

    fn input_buffer_ref(&self) -> usize;

    /// Write battery RAM to [`Engine::BATTERY_RAM_FILE`]
    fn save_battery_ram(&mut self) -> bool;

    /// Read battery RAM from [`Engine::BATTERY_RAM_FILE`]
    fn load_battery_ram(&mut self) -> bool;

    /// Write a full snapshot to [`Engine::STATE_FILE`]
    fn serialize_state(&mut self) -> bool;

    /// Restore a full snapshot from [`Engine::STATE_FILE`]
    fn deserialize_state(&mut self) -> bool;

    fn memory(&self) -> &LinearMemory;

    fn memory_mut(&mut self) -> &mut LinearMemory;

    fn write_file(&mut self, path: &str, data: &[u8]);

    fn read_file(&self, path: &str) -> Option<Vec<u8>>;

    fn remove_file(&mut self, path: &str);
}
