//! Scan code set 1 decoding with shift/control latches.
//!
//! Only the shell path uses this decoder; the polling modes look at raw
//! make codes.

use crate::constants::keyboard::{BREAK_BIT, LEFT_CTRL, LEFT_SHIFT, RIGHT_SHIFT};
use crate::constants::vga::{MAX_TEXT_SCALE, MIN_TEXT_SCALE};

/// Table entry for scan codes without a character.
pub const NO_MAPPING: u8 = 0;

const fn keymap(prefix: &[u8]) -> [u8; 128] {
    let mut map = [NO_MAPPING; 128];
    let mut i = 0;
    while i < prefix.len() {
        map[i] = prefix[i];
        i += 1;
    }
    map
}

/// US layout, unshifted.
pub static UNSHIFTED: [u8; 128] = keymap(&[
    0, 27, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 0x08,
    b'\t', b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n',
    0, b'a', b's', b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0, b'\\',
    b'z', b'x', b'c', b'v', b'b', b'n', b'm', b',', b'.', b'/', 0, b'*', 0, b' ',
]);

/// US layout, shift held.
pub static SHIFTED: [u8; 128] = keymap(&[
    0, 27, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', 0x08,
    b'\t', b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n',
    0, b'A', b'S', b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~', 0, b'|',
    b'Z', b'X', b'C', b'V', b'B', b'N', b'M', b'<', b'>', b'?', 0, b'*', 0, b' ',
]);

/// Character for a make code, or `None` for unmapped keys.
pub fn translate(scancode: u8, shift: bool) -> Option<char> {
    let table = if shift { &SHIFTED } else { &UNSHIFTED };
    match table.get(usize::from(scancode)) {
        Some(&NO_MAPPING) | None => None,
        Some(&byte) => Some(char::from(byte)),
    }
}

/// Requested change to the display text scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleAdjust {
    Set(u8),
    Increase,
    Decrease,
}

impl ScaleAdjust {
    /// Ctrl+key combinations that adjust the scale.
    pub fn from_control_key(c: char) -> Option<Self> {
        match c {
            '1'..='4' => Some(ScaleAdjust::Set(c as u8 - b'0')),
            '+' | '=' => Some(ScaleAdjust::Increase),
            '-' | '_' => Some(ScaleAdjust::Decrease),
            _ => None,
        }
    }

    /// New scale, kept within the supported range.
    pub fn apply(self, current: u8) -> u8 {
        match self {
            ScaleAdjust::Set(scale) if (MIN_TEXT_SCALE..=MAX_TEXT_SCALE).contains(&scale) => scale,
            ScaleAdjust::Set(_) => current,
            ScaleAdjust::Increase => (current + 1).min(MAX_TEXT_SCALE),
            ScaleAdjust::Decrease => current.saturating_sub(1).max(MIN_TEXT_SCALE),
        }
    }
}

/// Output of one decoded scan code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Scale(ScaleAdjust),
}

/// Shift and control latches.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
}

/// Scan code to character state machine.
#[derive(Debug, Default, Clone)]
pub struct Decoder {
    modifiers: Modifiers,
}

impl Decoder {
    pub const fn new() -> Self {
        Decoder {
            modifiers: Modifiers {
                shift: false,
                control: false,
            },
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Clear both latches (keyboard initialization).
    pub fn reset(&mut self) {
        self.modifiers = Modifiers::default();
    }

    /// Feed one raw scan code.
    ///
    /// Modifier make/break codes only move the latches. Other break codes are
    /// dropped. With control latched a key is a scale command, never text.
    pub fn feed(&mut self, scancode: u8) -> Option<Key> {
        match scancode {
            LEFT_SHIFT | RIGHT_SHIFT => {
                self.modifiers.shift = true;
                return None;
            }
            code if code == LEFT_SHIFT | BREAK_BIT || code == RIGHT_SHIFT | BREAK_BIT => {
                self.modifiers.shift = false;
                return None;
            }
            LEFT_CTRL => {
                self.modifiers.control = true;
                return None;
            }
            code if code == LEFT_CTRL | BREAK_BIT => {
                self.modifiers.control = false;
                return None;
            }
            code if code & BREAK_BIT != 0 => return None,
            _ => {}
        }

        let c = translate(scancode, self.modifiers.shift)?;
        if self.modifiers.control {
            ScaleAdjust::from_control_key(c).map(Key::Scale)
        } else {
            Some(Key::Char(c))
        }
    }
}
