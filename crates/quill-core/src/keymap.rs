//! Key chords used to address surface commands.
//!
//! A chord is a set of modifiers plus one key, written `ctrl+h` or
//! `Ctrl+Shift+F`. Parsing is case-insensitive; display is canonical so a
//! chord round-trips through its string form.

use std::fmt;
use std::str::FromStr;

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool, // Cmd on macOS, Win elsewhere
}

impl Modifiers {
    /// No modifiers pressed.
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    /// Ctrl modifier.
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    /// Returns true if no modifiers are pressed.
    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift && !self.meta
    }

    fn apply(&mut self, token: &str) -> bool {
        match token {
            "ctrl" | "control" => self.ctrl = true,
            "alt" | "option" => self.alt = true,
            "shift" => self.shift = true,
            "meta" | "cmd" | "win" | "super" => self.meta = true,
            _ => return false,
        }
        true
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.alt {
            parts.push("Alt");
        }
        if self.shift {
            parts.push("Shift");
        }
        if self.meta {
            parts.push("Meta");
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// A key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Escape,
    Space,
    F(u8),
}

impl Key {
    /// Parses a single key name. Letters are normalized to lowercase.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "enter" | "return" => Some(Key::Enter),
            "tab" => Some(Key::Tab),
            "escape" | "esc" => Some(Key::Escape),
            "space" => Some(Key::Space),
            _ if lower.starts_with('f') && lower.len() > 1 && lower.len() <= 3 => {
                lower[1..].parse().ok().map(Key::F)
            }
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Key::Char(c)),
                    _ => None,
                }
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c.to_uppercase()),
            Key::Enter => write!(f, "Enter"),
            Key::Tab => write!(f, "Tab"),
            Key::Escape => write!(f, "Escape"),
            Key::Space => write!(f, "Space"),
            Key::F(n) => write!(f, "F{}", n),
        }
    }
}

/// Modifiers plus one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl KeyChord {
    /// Creates a chord.
    pub fn new(modifiers: Modifiers, key: Key) -> Self {
        Self { modifiers, key }
    }

    /// `Ctrl+<c>`.
    pub fn ctrl(c: char) -> Self {
        Self::new(Modifiers::CTRL, Key::Char(c.to_ascii_lowercase()))
    }

    /// Parses a chord like `"ctrl+h"`. Returns `None` on unknown tokens.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<String> = s.split('+').map(|p| p.trim().to_lowercase()).collect();
        let (key_str, mods) = parts.split_last()?;

        let mut modifiers = Modifiers::NONE;
        for token in mods {
            if !modifiers.apply(token) {
                return None;
            }
        }

        Some(Self::new(modifiers, Key::parse(key_str)?))
    }
}

impl FromStr for KeyChord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid key chord: {s}"))
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chord_parse() {
        let chord = KeyChord::parse("ctrl+h").unwrap();
        assert_eq!(chord, KeyChord::ctrl('h'));
        assert!(chord.modifiers.ctrl);
        assert!(!chord.modifiers.shift);
    }

    #[test]
    fn test_chord_case_insensitive() {
        assert_eq!(KeyChord::parse("Ctrl+H"), KeyChord::parse("ctrl+h"));
        assert_eq!(KeyChord::ctrl('H'), KeyChord::ctrl('h'));
    }

    #[test]
    fn test_chord_display() {
        assert_eq!(KeyChord::ctrl('h').to_string(), "Ctrl+H");
        let chord: KeyChord = "ctrl+shift+f5".parse().unwrap();
        assert_eq!(chord.to_string(), "Ctrl+Shift+F5");
    }

    #[test]
    fn test_chord_rejects_garbage() {
        assert!(KeyChord::parse("hyper+h").is_none());
        assert!(KeyChord::parse("ctrl+").is_none());
        assert!(KeyChord::parse("ctrl+hh").is_none());
    }
}
