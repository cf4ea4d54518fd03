//! Abstract controllers
//!
//! Host devices (keyboard, gamepads) are reduced to a small set of
//! abstract controls per port. Device event handlers write through a
//! [`ControllerFeed`]; the pacing loop reads a snapshot taken by
//! [`ControllerSource::poll`] once per step.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Abstract controller control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    Select,
    Start,
    /// Reserved for the host (pause menu)
    Escape,
}

impl Control {
    pub const ALL: [Control; 13] = [
        Self::Up,
        Self::Down,
        Self::Left,
        Self::Right,
        Self::A,
        Self::B,
        Self::X,
        Self::Y,
        Self::LeftBumper,
        Self::RightBumper,
        Self::Select,
        Self::Start,
        Self::Escape,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::A => "A",
            Self::B => "B",
            Self::X => "X",
            Self::Y => "Y",
            Self::LeftBumper => "LeftBumper",
            Self::RightBumper => "RightBumper",
            Self::Select => "Select",
            Self::Start => "Start",
            Self::Escape => "Escape",
        }
    }

    /// Parse a control name as written in the configuration file
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Source of polled controller state
pub trait ControllerSource {
    /// Snapshot live device state; queries until the next poll see this snapshot
    fn poll(&mut self);

    fn is_down(&self, port: usize, control: Control) -> bool;
}

type PortStates = Vec<HashSet<Control>>;

/// Writer side of [`VirtualControllers`], cloneable into device event handlers
#[derive(Debug, Clone)]
pub struct ControllerFeed {
    live: Arc<Mutex<PortStates>>,
}

impl ControllerFeed {
    pub fn set(&self, port: usize, control: Control, pressed: bool) {
        let mut live = self.live.lock();
        let Some(state) = live.get_mut(port) else {
            tracing::warn!("Ignoring input for unknown port {}", port);
            return;
        };
        if pressed {
            state.insert(control);
        } else {
            state.remove(&control);
        }
    }

    pub fn press(&self, port: usize, control: Control) {
        self.set(port, control, true);
    }

    pub fn release(&self, port: usize, control: Control) {
        self.set(port, control, false);
    }

    /// Release every control on every port (e.g. on focus loss)
    pub fn release_all(&self) {
        for state in self.live.lock().iter_mut() {
            state.clear();
        }
    }
}

/// In-memory controllers fed by host device events
#[derive(Debug)]
pub struct VirtualControllers {
    live: Arc<Mutex<PortStates>>,
    polled: PortStates,
}

impl VirtualControllers {
    pub fn new(ports: usize) -> Self {
        Self {
            live: Arc::new(Mutex::new(vec![HashSet::new(); ports])),
            polled: vec![HashSet::new(); ports],
        }
    }

    pub fn feed(&self) -> ControllerFeed {
        ControllerFeed {
            live: Arc::clone(&self.live),
        }
    }

    pub fn ports(&self) -> usize {
        self.polled.len()
    }
}

impl ControllerSource for VirtualControllers {
    fn poll(&mut self) {
        self.polled.clone_from(&self.live.lock());
    }

    fn is_down(&self, port: usize, control: Control) -> bool {
        self.polled
            .get(port)
            .is_some_and(|state| state.contains(&control))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_names_roundtrip() {
        for control in Control::ALL {
            assert_eq!(Control::from_name(control.name()), Some(control));
        }
        assert_eq!(Control::from_name(" escape "), Some(Control::Escape));
        assert_eq!(Control::from_name("Turbo"), None);
    }

    #[test]
    fn test_state_visible_only_after_poll() {
        let mut controllers = VirtualControllers::new(2);
        let feed = controllers.feed();

        feed.press(1, Control::Start);
        assert!(!controllers.is_down(1, Control::Start));

        controllers.poll();
        assert!(controllers.is_down(1, Control::Start));
        assert!(!controllers.is_down(0, Control::Start));

        feed.release_all();
        controllers.poll();
        assert!(!controllers.is_down(1, Control::Start));
    }

    #[test]
    fn test_unknown_port_is_ignored() {
        let mut controllers = VirtualControllers::new(1);
        controllers.feed().press(5, Control::A);
        controllers.poll();
        assert!(!controllers.is_down(5, Control::A));
    }
}
