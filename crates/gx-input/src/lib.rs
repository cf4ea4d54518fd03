//! Input handling for genplus-host
//!
//! Abstract controllers are polled once per step and packed into the
//! 16-bit register layout the emulation core reads.

pub mod controls;
pub mod mapping;
pub mod pad;
pub mod translator;

pub use controls::{Control, ControllerFeed, ControllerSource, VirtualControllers};
pub use mapping::{ControlMapping, KeyboardBindings};
pub use pad::PadButtons;
pub use translator::{InputTranslator, PauseLatch, PollOutcome, MAX_PORTS};
