use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Virtual key code as reported by the native host (low 16 bits of the raw word).
pub type KeyCode = u16;

/// Mouse button id as reported by the native host.
pub type MouseButton = u16;

pub const MOUSE_BUTTON_LEFT: MouseButton = 1;
pub const MOUSE_BUTTON_RIGHT: MouseButton = 2;
pub const MOUSE_BUTTON_MIDDLE: MouseButton = 3;

bitflags! {
    /// Side-specific modifier mask carried in the high 16 bits of a raw input word.
    ///
    /// The combined masks (`SHIFT`, `CONTROL`, ...) match either side.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Modifiers: u16 {
        const LSHIFT   = 1;
        const RSHIFT   = 2;
        const LCONTROL = 4;
        const RCONTROL = 8;
        const LALT     = 16;
        const RALT     = 32;
        const LSUPER   = 64;
        const RSUPER   = 128;

        const SHIFT   = Self::LSHIFT.bits() | Self::RSHIFT.bits();
        const CONTROL = Self::LCONTROL.bits() | Self::RCONTROL.bits();
        const ALT     = Self::LALT.bits() | Self::RALT.bits();
        const SUPER   = Self::LSUPER.bits() | Self::RSUPER.bits();
    }
}

impl Modifiers {
    pub fn is_shift_down(self) -> bool {
        self.intersects(Self::SHIFT)
    }

    pub fn is_control_down(self) -> bool {
        self.intersects(Self::CONTROL)
    }

    pub fn is_alt_down(self) -> bool {
        self.intersects(Self::ALT)
    }

    pub fn is_super_down(self) -> bool {
        self.intersects(Self::SUPER)
    }
}

/// Edge direction of a key or mouse button notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Down,
    Up,
}

impl Action {
    /// Decode the native action word (1 = down, 2 = up).
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Down),
            2 => Some(Self::Up),
            _ => None,
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            Self::Down => 1,
            Self::Up => 2,
        }
    }
}

/// Which input class a raw notification belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputKind {
    Key,
    Mouse,
}

impl InputKind {
    /// Decode the native kind word (1 = key, 2 = mouse).
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Key),
            2 => Some(Self::Mouse),
            _ => None,
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            Self::Key => 1,
            Self::Mouse => 2,
        }
    }
}

/// One decoded key or mouse notification.
///
/// Keyboard notifications always carry `x == y == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawInput {
    pub kind: InputKind,
    pub code: u16,
    pub action: Action,
    pub modifiers: Modifiers,
    pub x: i32,
    pub y: i32,
}

impl RawInput {
    pub fn key(code: KeyCode, action: Action, modifiers: Modifiers) -> Self {
        Self {
            kind: InputKind::Key,
            code,
            action,
            modifiers,
            x: 0,
            y: 0,
        }
    }

    pub fn mouse(button: MouseButton, action: Action, modifiers: Modifiers, x: i32, y: i32) -> Self {
        Self {
            kind: InputKind::Mouse,
            code: button,
            action,
            modifiers,
            x,
            y,
        }
    }

    /// Decode the narrow native callback signature.
    ///
    /// `code_with_mods`: low 16 bits code, high 16 bits modifier mask.
    /// `packed_xy`: low 32 bits x, high 32 bits y.
    /// Returns `None` for kinds or actions this bridge does not track.
    pub fn unpack(kind: u32, code_with_mods: u32, action: u32, packed_xy: u64) -> Option<Self> {
        let kind = InputKind::from_raw(kind)?;
        let action = Action::from_raw(action)?;
        let code = (code_with_mods & 0xFFFF) as u16;
        let modifiers = Modifiers::from_bits_truncate((code_with_mods >> 16) as u16);
        let (x, y) = match kind {
            InputKind::Key => (0, 0),
            InputKind::Mouse => (
                (packed_xy & 0xFFFF_FFFF) as u32 as i32,
                (packed_xy >> 32) as u32 as i32,
            ),
        };
        Some(Self {
            kind,
            code,
            action,
            modifiers,
            x,
            y,
        })
    }

    /// Inverse of [`RawInput::unpack`], used by hosts that emit the packed form.
    pub fn pack(&self) -> (u32, u32, u32, u64) {
        let code_with_mods = u32::from(self.code) | (u32::from(self.modifiers.bits()) << 16);
        let packed_xy = u64::from(self.x as u32) | (u64::from(self.y as u32) << 32);
        (self.kind.to_raw(), code_with_mods, self.action.to_raw(), packed_xy)
    }

    pub fn to_event(&self) -> Event {
        match self.kind {
            InputKind::Key => Event::Key {
                code: self.code,
                action: self.action,
                modifiers: self.modifiers,
            },
            InputKind::Mouse => Event::Mouse {
                button: self.code,
                action: self.action,
                modifiers: self.modifiers,
                x: self.x,
                y: self.y,
            },
        }
    }
}

/// Decode the IEEE-754 bit patterns of a resize notification.
pub fn decode_resize_bits(width_bits: u64, height_bits: u64) -> (f64, f64) {
    (f64::from_bits(width_bits), f64::from_bits(height_bits))
}

/// Round a fractional size to the integer pixels handed to resize handlers.
///
/// NaN and negative sizes collapse to zero.
pub fn round_size(width: f64, height: f64) -> (u32, u32) {
    let clamp = |v: f64| if v.is_finite() && v > 0.0 { v.round() as u32 } else { 0 };
    (clamp(width), clamp(height))
}

/// Opaque reference to a native resource. Only valid while its session is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub u64);

/// A notification as observed by polling consumers. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Key {
        code: KeyCode,
        action: Action,
        modifiers: Modifiers,
    },
    Mouse {
        button: MouseButton,
        action: Action,
        modifiers: Modifiers,
        x: i32,
        y: i32,
    },
    Resize {
        width: f64,
        height: f64,
    },
    Closed,
    Created,
}

impl Event {
    pub fn key(code: KeyCode, action: Action) -> Self {
        Self::Key {
            code,
            action,
            modifiers: Modifiers::empty(),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
