//! Input mapping
//!
//! Maps abstract controls to pad buttons, and host keyboard keys to
//! abstract controls on port 0.

use crate::controls::{Control, ControllerFeed, ControllerSource};
use crate::pad::PadButtons;
use std::collections::HashMap;

/// Abstract control to pad button mapping
#[derive(Debug, Clone)]
pub struct ControlMapping {
    mappings: HashMap<Control, PadButtons>,
}

impl ControlMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self {
            mappings: HashMap::new(),
        }
    }

    /// Default layout: the three face buttons sit on X/A/B, the extra
    /// 6-button row on the left bumper, Y and the right bumper.
    pub fn default_pad() -> Self {
        let mut mapping = Self::new();

        mapping.map(Control::Up, PadButtons::UP);
        mapping.map(Control::Down, PadButtons::DOWN);
        mapping.map(Control::Left, PadButtons::LEFT);
        mapping.map(Control::Right, PadButtons::RIGHT);

        mapping.map(Control::X, PadButtons::A);
        mapping.map(Control::A, PadButtons::B);
        mapping.map(Control::B, PadButtons::C);

        mapping.map(Control::LeftBumper, PadButtons::X);
        mapping.map(Control::Y, PadButtons::Y);
        mapping.map(Control::RightBumper, PadButtons::Z);

        mapping.map(Control::Select, PadButtons::MODE);
        mapping.map(Control::Start, PadButtons::START);

        mapping
    }

    pub fn map(&mut self, control: Control, buttons: PadButtons) {
        self.mappings.insert(control, buttons);
    }

    pub fn remove(&mut self, control: Control) {
        self.mappings.remove(&control);
    }

    pub fn get(&self, control: Control) -> Option<PadButtons> {
        self.mappings.get(&control).copied()
    }

    /// Pack the polled state of `port` into pad buttons
    pub fn pack<C: ControllerSource + ?Sized>(&self, source: &C, port: usize) -> PadButtons {
        self.mappings
            .iter()
            .filter(|(control, _)| source.is_down(port, **control))
            .fold(PadButtons::empty(), |acc, (_, buttons)| acc | *buttons)
    }
}

impl Default for ControlMapping {
    fn default() -> Self {
        Self::default_pad()
    }
}

/// Keyboard key (DOM `KeyboardEvent.code` naming) to control bindings for port 0
#[derive(Debug, Clone)]
pub struct KeyboardBindings {
    bindings: HashMap<String, Control>,
}

impl KeyboardBindings {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    pub fn default_keyboard() -> Self {
        let mut bindings = Self::new();
        for (key, control) in [
            ("ArrowUp", Control::Up),
            ("ArrowDown", Control::Down),
            ("ArrowLeft", Control::Left),
            ("ArrowRight", Control::Right),
            ("KeyZ", Control::A),
            ("KeyX", Control::B),
            ("KeyA", Control::X),
            ("KeyS", Control::Y),
            ("KeyQ", Control::LeftBumper),
            ("KeyW", Control::RightBumper),
            ("ShiftRight", Control::Select),
            ("Enter", Control::Start),
            ("Escape", Control::Escape),
        ] {
            bindings.bind(key, control);
        }
        bindings
    }

    pub fn bind(&mut self, key: &str, control: Control) {
        self.bindings.insert(key.to_string(), control);
    }

    pub fn get(&self, key: &str) -> Option<Control> {
        self.bindings.get(key).copied()
    }

    /// Forward a key event to port 0. Returns `false` for unbound keys.
    pub fn handle_key(&self, feed: &ControllerFeed, key: &str, pressed: bool) -> bool {
        match self.get(key) {
            Some(control) => {
                feed.set(0, control, pressed);
                true
            }
            None => false,
        }
    }
}

impl Default for KeyboardBindings {
    fn default() -> Self {
        Self::default_keyboard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::VirtualControllers;

    #[test]
    fn test_default_pad_mapping() {
        let mapping = ControlMapping::default_pad();
        assert_eq!(mapping.get(Control::X), Some(PadButtons::A));
        assert_eq!(mapping.get(Control::A), Some(PadButtons::B));
        assert_eq!(mapping.get(Control::B), Some(PadButtons::C));
        assert_eq!(mapping.get(Control::Select), Some(PadButtons::MODE));
        assert_eq!(mapping.get(Control::Escape), None);
    }

    #[test]
    fn test_pack_combines_buttons() {
        let mapping = ControlMapping::default_pad();
        let mut controllers = VirtualControllers::new(2);
        let feed = controllers.feed();
        feed.press(0, Control::Up);
        feed.press(0, Control::Start);
        feed.press(1, Control::RightBumper);
        controllers.poll();

        assert_eq!(mapping.pack(&controllers, 0), PadButtons::UP | PadButtons::START);
        assert_eq!(mapping.pack(&controllers, 1), PadButtons::Z);
    }

    #[test]
    fn test_remove_mapping() {
        let mut mapping = ControlMapping::default_pad();
        mapping.remove(Control::Start);
        assert!(mapping.get(Control::Start).is_none());
    }

    #[test]
    fn test_keyboard_bindings_feed_port_zero() {
        let bindings = KeyboardBindings::default_keyboard();
        let mut controllers = VirtualControllers::new(2);
        let feed = controllers.feed();

        assert!(bindings.handle_key(&feed, "ArrowDown", true));
        assert!(!bindings.handle_key(&feed, "F13", true));
        controllers.poll();
        assert!(controllers.is_down(0, Control::Down));

        bindings.handle_key(&feed, "ArrowDown", false);
        controllers.poll();
        assert!(!controllers.is_down(0, Control::Down));
    }
}
