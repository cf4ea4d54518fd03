//! Pad register layout

use bitflags::bitflags;

bitflags! {
    /// Button bits of one input register word, as read by the core
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PadButtons: u16 {
        const UP    = 0x0001;
        const DOWN  = 0x0002;
        const LEFT  = 0x0004;
        const RIGHT = 0x0008;
        const B     = 0x0010;
        const C     = 0x0020;
        const A     = 0x0040;
        const START = 0x0080;
        const Z     = 0x0100;
        const Y     = 0x0200;
        const X     = 0x0400;
        const MODE  = 0x0800;
    }
}

impl PadButtons {
    /// Logical button order: Up, Down, Left, Right, A, B, C, X, Y, Z, Start, Mode
    pub const LOGICAL_ORDER: [PadButtons; 12] = [
        Self::UP,
        Self::DOWN,
        Self::LEFT,
        Self::RIGHT,
        Self::A,
        Self::B,
        Self::C,
        Self::X,
        Self::Y,
        Self::Z,
        Self::START,
        Self::MODE,
    ];
}
