//! HID keyboard/keypad page usage codes.

pub mod key_range {
    pub const NONE: u8 = 0x00;

    pub const BASIC_MIN: u8 = 0x04;
    pub const BASIC_A: u8 = 0x04;
    pub const BASIC_1: u8 = 0x1e;
    pub const BASIC_0: u8 = 0x27;
    pub const BASIC_MAX: u8 = 0xa4;
    pub const MODIFIER_MIN: u8 = 0xe0;
    pub const MODIFIER_MAX: u8 = 0xe7;
}

/// Named keycodes. Letters and digits follow the US layout.
pub mod kc {
    pub const A: u8 = 0x04;
    pub const B: u8 = 0x05;
    pub const C: u8 = 0x06;
    pub const D: u8 = 0x07;
    pub const E: u8 = 0x08;
    pub const F: u8 = 0x09;
    pub const G: u8 = 0x0a;
    pub const H: u8 = 0x0b;
    pub const I: u8 = 0x0c;
    pub const J: u8 = 0x0d;
    pub const K: u8 = 0x0e;
    pub const L: u8 = 0x0f;
    pub const M: u8 = 0x10;
    pub const N: u8 = 0x11;
    pub const O: u8 = 0x12;
    pub const P: u8 = 0x13;
    pub const Q: u8 = 0x14;
    pub const R: u8 = 0x15;
    pub const S: u8 = 0x16;
    pub const T: u8 = 0x17;
    pub const U: u8 = 0x18;
    pub const V: u8 = 0x19;
    pub const W: u8 = 0x1a;
    pub const X: u8 = 0x1b;
    pub const Y: u8 = 0x1c;
    pub const Z: u8 = 0x1d;

    pub const N1: u8 = 0x1e;
    pub const N2: u8 = 0x1f;
    pub const N3: u8 = 0x20;
    pub const N4: u8 = 0x21;
    pub const N5: u8 = 0x22;
    pub const N6: u8 = 0x23;
    pub const N7: u8 = 0x24;
    pub const N8: u8 = 0x25;
    pub const N9: u8 = 0x26;
    pub const N0: u8 = 0x27;

    pub const ENTER: u8 = 0x28;
    pub const ESCAPE: u8 = 0x29;
    pub const BACKSPACE: u8 = 0x2a;
    pub const TAB: u8 = 0x2b;
    pub const SPACE: u8 = 0x2c;
    pub const MINUS: u8 = 0x2d;
    pub const EQUAL: u8 = 0x2e;
    pub const LEFT_BRACKET: u8 = 0x2f;
    pub const RIGHT_BRACKET: u8 = 0x30;
    pub const BACKSLASH: u8 = 0x31;
    pub const SEMICOLON: u8 = 0x33;
    pub const QUOTE: u8 = 0x34;
    pub const GRAVE: u8 = 0x35;
    pub const COMMA: u8 = 0x36;
    pub const DOT: u8 = 0x37;
    pub const SLASH: u8 = 0x38;
    pub const CAPS_LOCK: u8 = 0x39;

    pub const F1: u8 = 0x3a;
    pub const F12: u8 = 0x45;

    pub const RIGHT: u8 = 0x4f;
    pub const LEFT: u8 = 0x50;
    pub const DOWN: u8 = 0x51;
    pub const UP: u8 = 0x52;

    pub const LEFT_CTRL: u8 = 0xe0;
    pub const LEFT_SHIFT: u8 = 0xe1;
    pub const LEFT_ALT: u8 = 0xe2;
    pub const LEFT_GUI: u8 = 0xe3;
    pub const RIGHT_CTRL: u8 = 0xe4;
    pub const RIGHT_SHIFT: u8 = 0xe5;
    pub const RIGHT_ALT: u8 = 0xe6;
    pub const RIGHT_GUI: u8 = 0xe7;
}

/// Modifier mask bits as laid out in byte 0 of a boot keyboard report.
pub mod modifiers {
    pub const LEFT_CTRL: u8 = 1;
    pub const LEFT_SHIFT: u8 = 1 << 1;
    pub const LEFT_ALT: u8 = 1 << 2;
    pub const LEFT_GUI: u8 = 1 << 3;
    pub const RIGHT_CTRL: u8 = 1 << 4;
    pub const RIGHT_SHIFT: u8 = 1 << 5;
    pub const RIGHT_ALT: u8 = 1 << 6;
    pub const RIGHT_GUI: u8 = 1 << 7;
}

pub const fn is_modifier(code: u8) -> bool {
    code >= key_range::MODIFIER_MIN && code <= key_range::MODIFIER_MAX
}

/// The report mask bit for a modifier keycode; `None` for any other keycode.
pub const fn modifier_bit(code: u8) -> Option<u8> {
    if is_modifier(code) {
        Some(1 << (code - key_range::MODIFIER_MIN))
    } else {
        None
    }
}

/// Names for consecutive usage codes starting at [`key_range::BASIC_MIN`]. A `/` separates aliases.
const BASIC_NAMES: &[&str] = &[
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z", //
    "1/n1", "2/n2", "3/n3", "4/n4", "5/n5", "6/n6", "7/n7", "8/n8", "9/n9", "0/n0", //
    "enter/return/ent",
    "escape/esc",
    "backspace/bksp",
    "tab",
    "space/spc",
    "minus/-",
    "equal/=",
    "leftbracket/[",
    "rightbracket/]",
    "backslash/\\",
    "nonushash",
    "semicolon/scolon/;",
    "quote/apostrophe/'",
    "grave/`",
    "comma/,",
    "dot/period/.",
    "slash//",
    "capslock",
    "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12", //
    "printscreen",
    "scrolllock",
    "pause",
    "insert",
    "home",
    "pageup/pgup",
    "delete/del",
    "end",
    "pagedown/pgdn",
    "right",
    "left",
    "down",
    "up",
];

const MODIFIER_NAMES: &[&str] = &[
    "leftctrl/lctrl/lctl",
    "leftshift/lshift/lsft",
    "leftalt/lalt",
    "leftgui/lgui/lcmd",
    "rightctrl/rctrl/rctl",
    "rightshift/rshift/rsft",
    "rightalt/ralt/altgr",
    "rightgui/rgui/rcmd",
];

/// Look up a keycode by mnemonic. Matching ignores case, `-` and `_`, so `"LEFT_SHIFT"`,
/// `"left-shift"` and `"leftshift"` are equivalent.
///
/// ```
/// use tickpad_common::keycodes::{key_code, kc};
///
/// assert_eq!(key_code("W"), Some(kc::W));
/// assert_eq!(key_code("left_shift"), Some(kc::LEFT_SHIFT));
/// assert_eq!(key_code("nope"), None);
/// ```
pub fn key_code(name: &str) -> Option<u8> {
    if name.is_empty() {
        return None;
    }
    find_name(BASIC_NAMES, name)
        .map(|i| key_range::BASIC_MIN + i as u8)
        .or_else(|| find_name(MODIFIER_NAMES, name).map(|i| key_range::MODIFIER_MIN + i as u8))
}

fn find_name(table: &[&str], name: &str) -> Option<usize> {
    table
        .iter()
        .position(|aliases| split_aliases(aliases).any(|alias| same_name(alias, name)))
}

/// A `/` at the start of the remainder is an alias itself (see `"slash//"`).
fn split_aliases(aliases: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(aliases);
    core::iter::from_fn(move || {
        let s = rest?;
        match s.find('/') {
            Some(0) | None => {
                rest = None;
                Some(s)
            }
            Some(i) => {
                rest = Some(&s[i + 1..]);
                Some(&s[..i])
            }
        }
    })
}

fn same_name(alias: &str, name: &str) -> bool {
    if alias.len() == 1 || name.len() == 1 {
        return alias.eq_ignore_ascii_case(name);
    }
    let mut a = alias.bytes().filter(|b| !matches!(b, b'-' | b'_'));
    let mut b = name.bytes().filter(|b| !matches!(b, b'-' | b'_'));
    loop {
        match (a.next(), b.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if x.eq_ignore_ascii_case(&y) => {}
            _ => return false,
        }
    }
}

#[cfg(test)]
#[path = "keycodes_test.rs"]
mod test;
