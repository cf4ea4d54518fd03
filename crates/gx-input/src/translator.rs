//! Input translator
//!
//! Packs polled controller state into the core's input registers and
//! watches for the reserved pause chord.
//!
//! The pause chord is edge-triggered through a small latch:
//!
//! ```text
//! Armed --chord down--> Held(port) --chord up--> Released(port) --rearm--> Armed
//! ```
//!
//! While the latch is not `Armed` the register word of the port that
//! raised the request is left untouched.

use crate::controls::{Control, ControllerSource};
use crate::mapping::ControlMapping;
use gx_core::config::InputConfig;
use gx_core::HostError;

/// Number of controller ports written each step
pub const MAX_PORTS: usize = 2;

/// Pause chord latch state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseLatch {
    Armed,
    /// Chord detected on `port` and still held
    Held { port: usize },
    /// Chord released, waiting for the session to resume
    Released { port: usize },
}

/// Result of one input poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Continue,
    PauseRequested { port: usize },
}

/// Translates abstract controller state into input register words
#[derive(Debug, Clone)]
pub struct InputTranslator {
    mapping: ControlMapping,
    pause_chord: Vec<Control>,
    latch: PauseLatch,
}

impl InputTranslator {
    pub fn new(mapping: ControlMapping, pause_chord: Vec<Control>) -> Self {
        Self {
            mapping,
            pause_chord,
            latch: PauseLatch::Armed,
        }
    }

    /// Build a translator with the default pad mapping and the configured chord
    pub fn from_config(config: &InputConfig) -> Result<Self, HostError> {
        let mut chord = Vec::with_capacity(config.pause_chord.len());
        for name in &config.pause_chord {
            let control = Control::from_name(name)
                .ok_or_else(|| HostError::Config(format!("unknown pause control '{}'", name)))?;
            if !chord.contains(&control) {
                chord.push(control);
            }
        }
        if chord.is_empty() {
            return Err(HostError::Config("pause chord must name at least one control".into()));
        }
        Ok(Self::new(ControlMapping::default_pad(), chord))
    }

    pub fn mapping(&self) -> &ControlMapping {
        &self.mapping
    }

    pub fn mapping_mut(&mut self) -> &mut ControlMapping {
        &mut self.mapping
    }

    pub fn pause_chord(&self) -> &[Control] {
        &self.pause_chord
    }

    pub fn latch(&self) -> PauseLatch {
        self.latch
    }

    fn chord_down<C: ControllerSource + ?Sized>(&self, source: &C, port: usize) -> bool {
        !self.pause_chord.is_empty()
            && self
                .pause_chord
                .iter()
                .all(|control| source.is_down(port, *control))
    }

    fn suppressed_port(&self) -> Option<usize> {
        match self.latch {
            PauseLatch::Armed => None,
            PauseLatch::Held { port } | PauseLatch::Released { port } => Some(port),
        }
    }

    /// Poll `source` and rewrite the register words of every port.
    ///
    /// Returns `PauseRequested` exactly once per chord press.
    pub fn poll<C: ControllerSource + ?Sized>(
        &mut self,
        source: &mut C,
        registers: &mut [u16],
    ) -> PollOutcome {
        source.poll();

        let mut outcome = PollOutcome::Continue;
        let ports = MAX_PORTS.min(registers.len());

        for port in 0..ports {
            if self.latch == PauseLatch::Armed && self.chord_down(source, port) {
                tracing::debug!("Pause chord pressed on port {}", port);
                self.latch = PauseLatch::Held { port };
                outcome = PollOutcome::PauseRequested { port };
            }

            if self.suppressed_port() == Some(port) {
                continue;
            }

            registers[port] = self.mapping.pack(source, port).bits();
        }

        outcome
    }

    /// Poll for release of a held chord. Returns `true` once nothing is held.
    pub fn poll_release<C: ControllerSource + ?Sized>(&mut self, source: &mut C) -> bool {
        source.poll();
        match self.latch {
            PauseLatch::Held { port } => {
                if self.chord_down(source, port) {
                    false
                } else {
                    tracing::trace!("Pause chord released on port {}", port);
                    self.latch = PauseLatch::Released { port };
                    true
                }
            }
            PauseLatch::Released { .. } | PauseLatch::Armed => true,
        }
    }

    /// Re-arm chord detection after resume. Fails while the chord is still held.
    pub fn rearm(&mut self) -> bool {
        match self.latch {
            PauseLatch::Held { .. } => false,
            PauseLatch::Released { .. } | PauseLatch::Armed => {
                self.latch = PauseLatch::Armed;
                true
            }
        }
    }
}

impl Default for InputTranslator {
    fn default() -> Self {
        Self::new(ControlMapping::default_pad(), vec![Control::Escape])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::VirtualControllers;

    fn setup() -> (InputTranslator, VirtualControllers, [u16; 32]) {
        (InputTranslator::default(), VirtualControllers::new(MAX_PORTS), [0u16; 32])
    }

    #[test]
    fn test_down_on_port_zero() {
        let (mut translator, mut controllers, mut registers) = setup();
        let feed = controllers.feed();

        feed.press(0, Control::Down);
        assert_eq!(translator.poll(&mut controllers, &mut registers), PollOutcome::Continue);
        assert_eq!(registers[0], 0x0002);
        assert_eq!(registers[1], 0);

        feed.release(0, Control::Down);
        translator.poll(&mut controllers, &mut registers);
        assert_eq!(registers[0], 0);
    }

    #[test]
    fn test_pause_chord_is_edge_triggered() {
        let (mut translator, mut controllers, mut registers) = setup();
        let feed = controllers.feed();

        feed.press(1, Control::Escape);
        let mut requests = 0;
        for _ in 0..10 {
            if let PollOutcome::PauseRequested { port } = translator.poll(&mut controllers, &mut registers) {
                assert_eq!(port, 1);
                requests += 1;
            }
        }
        assert_eq!(requests, 1);
        assert_eq!(translator.latch(), PauseLatch::Held { port: 1 });
    }

    #[test]
    fn test_suppressed_port_keeps_register() {
        let (mut translator, mut controllers, mut registers) = setup();
        let feed = controllers.feed();

        feed.press(0, Control::Escape);
        translator.poll(&mut controllers, &mut registers);
        feed.press(0, Control::Start);
        feed.press(1, Control::Start);
        translator.poll(&mut controllers, &mut registers);

        assert_eq!(registers[0], 0);
        assert_eq!(registers[1], 0x0080);
    }

    #[test]
    fn test_release_then_rearm() {
        let (mut translator, mut controllers, mut registers) = setup();
        let feed = controllers.feed();

        feed.press(0, Control::Escape);
        translator.poll(&mut controllers, &mut registers);

        assert!(!translator.poll_release(&mut controllers));
        assert!(!translator.rearm());

        feed.release(0, Control::Escape);
        assert!(translator.poll_release(&mut controllers));
        assert_eq!(translator.latch(), PauseLatch::Released { port: 0 });

        assert!(translator.rearm());
        assert_eq!(translator.latch(), PauseLatch::Armed);

        feed.press(0, Control::Escape);
        assert_eq!(
            translator.poll(&mut controllers, &mut registers),
            PollOutcome::PauseRequested { port: 0 }
        );
    }

    #[test]
    fn test_multi_control_chord() {
        let mut translator = InputTranslator::new(
            ControlMapping::default_pad(),
            vec![Control::Select, Control::Start],
        );
        let mut controllers = VirtualControllers::new(MAX_PORTS);
        let feed = controllers.feed();
        let mut registers = [0u16; 32];

        feed.press(0, Control::Start);
        assert_eq!(translator.poll(&mut controllers, &mut registers), PollOutcome::Continue);
        assert_eq!(registers[0], 0x0080);

        feed.press(0, Control::Select);
        assert_eq!(
            translator.poll(&mut controllers, &mut registers),
            PollOutcome::PauseRequested { port: 0 }
        );
    }

    #[test]
    fn test_from_config() {
        let config = InputConfig {
            pause_chord: vec!["select".into(), "Start".into(), "Start".into()],
            release_poll_ms: 16,
        };
        let translator = InputTranslator::from_config(&config).unwrap();
        assert_eq!(translator.pause_chord(), &[Control::Select, Control::Start]);

        let bad = InputConfig {
            pause_chord: vec!["Turbo".into()],
            release_poll_ms: 16,
        };
        assert!(matches!(InputTranslator::from_config(&bad), Err(HostError::Config(_))));

        let empty = InputConfig {
            pause_chord: Vec::new(),
            release_poll_ms: 16,
        };
        assert!(InputTranslator::from_config(&empty).is_err());
    }
}
