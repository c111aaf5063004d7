//! Unified input model: key events, chords, keymap.
//!
//! The host delivers one [`KeyEvent`] per physical key press. Surfaces map
//! events to semantic [`KeyAction`] values through a [`Keymap`] so that
//! bindings can be changed without touching surface code. Ambient hotkeys
//! are expressed as exact [`KeyChord`] matches.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crossterm::event::{KeyCode, KeyModifiers};
use serde::{Deserialize, Serialize};

use crate::error::KeyfenceError;

/// Modifier bits this core cares about. Super/hyper/meta are masked away.
pub const TRACKED_MODIFIERS: KeyModifiers = KeyModifiers::SHIFT
    .union(KeyModifiers::CONTROL)
    .union(KeyModifiers::ALT);

// ─── Key Event ──────────────────────────────────────────────────────────────

/// A single key-down event delivered by the host.
///
/// `consumed` is the outcome flag: once set, the host must not run its own
/// native binding for this key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Key identifier.
    pub code: KeyCode,
    /// Shift/ctrl/alt state (other bits are always clear).
    pub modifiers: KeyModifiers,
    /// Whether some guard has absorbed this event.
    pub consumed: bool,
}

impl KeyEvent {
    /// Create an unconsumed event, masking untracked modifier bits.
    #[must_use]
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self {
            code,
            modifiers: modifiers.intersection(TRACKED_MODIFIERS),
            consumed: false,
        }
    }

    /// Create an event with no modifiers.
    #[must_use]
    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    /// Create a plain character event.
    #[must_use]
    pub fn char(ch: char) -> Self {
        Self::plain(KeyCode::Char(ch))
    }

    /// Mark the event consumed.
    pub const fn consume(&mut self) {
        self.consumed = true;
    }

    /// Whether shift is held.
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(KeyModifiers::SHIFT)
    }

    /// Whether control is held.
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(KeyModifiers::CONTROL)
    }

    /// Whether alt is held.
    #[must_use]
    pub const fn alt(&self) -> bool {
        self.modifiers.contains(KeyModifiers::ALT)
    }

    /// The typed character, if this event is text input.
    ///
    /// Control and alt combinations are never text; shift is allowed.
    #[must_use]
    pub fn text_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(ch)
                if !ch.is_control()
                    && !self
                        .modifiers
                        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                Some(ch)
            }
            _ => None,
        }
    }

    /// The chord this event represents.
    #[must_use]
    pub const fn chord(&self) -> KeyChord {
        KeyChord {
            code: self.code,
            modifiers: self.modifiers,
        }
    }
}

impl From<KeyChord> for KeyEvent {
    fn from(chord: KeyChord) -> Self {
        Self::new(chord.code, chord.modifiers)
    }
}

// ─── Key Chord ──────────────────────────────────────────────────────────────

/// An exact key + modifier combination, e.g. `ctrl+shift+f`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyChord {
    /// Key identifier.
    pub code: KeyCode,
    /// Required modifiers (exact match).
    pub modifiers: KeyModifiers,
}

impl KeyChord {
    /// Create a chord, masking untracked modifier bits.
    #[must_use]
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self {
            code,
            modifiers: modifiers.intersection(TRACKED_MODIFIERS),
        }
    }

    /// Chord with no modifiers.
    #[must_use]
    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    /// Whether an event triggers this chord.
    ///
    /// Character keys compare case-insensitively; modifiers must match exactly.
    #[must_use]
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if self.modifiers != event.modifiers {
            return false;
        }
        match (self.code, event.code) {
            (KeyCode::Char(a), KeyCode::Char(b)) => a.to_lowercase().eq(b.to_lowercase()),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("alt+")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            f.write_str("shift+")?;
        }
        f.write_str(&key_name(self.code))
    }
}

impl FromStr for KeyChord {
    type Err = KeyfenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| KeyfenceError::InvalidKey {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty key"));
        }

        // A trailing "+" after a separator is the plus key itself ("ctrl++").
        let (prefix, key_part) = if let Some(rest) = trimmed.strip_suffix("++") {
            (rest, "+")
        } else if trimmed == "+" {
            ("", "+")
        } else {
            match trimmed.rsplit_once('+') {
                Some((mods, key)) => (mods, key),
                None => ("", trimmed),
            }
        };

        let mut modifiers = KeyModifiers::NONE;
        if !prefix.is_empty() {
            for part in prefix.split('+') {
                match part.trim().to_ascii_lowercase().as_str() {
                    "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
                    "alt" => modifiers |= KeyModifiers::ALT,
                    "shift" => modifiers |= KeyModifiers::SHIFT,
                    _ => return Err(invalid("unknown modifier")),
                }
            }
        }

        let code = parse_key_name(key_part).ok_or_else(|| invalid("unknown key name"))?;
        Ok(Self::new(code, modifiers))
    }
}

impl TryFrom<String> for KeyChord {
    type Error = KeyfenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyChord> for String {
    fn from(chord: KeyChord) -> Self {
        chord.to_string()
    }
}

/// Stable display name for a key code.
#[must_use]
pub fn key_name(code: KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(ch) => ch.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => "BackTab".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Insert => "Insert".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::F(n) => format!("F{n}"),
        other => format!("{other:?}"),
    }
}

/// Parse a key name produced by [`key_name`] (case-insensitive for named keys).
#[must_use]
pub fn parse_key_name(name: &str) -> Option<KeyCode> {
    let name = name.trim();
    let mut chars = name.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return Some(KeyCode::Char(ch));
    }
    let lower = name.to_ascii_lowercase();
    let code = match lower.as_str() {
        "space" => KeyCode::Char(' '),
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" | "pgup" => KeyCode::PageUp,
        "pagedown" | "pgdn" => KeyCode::PageDown,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        _ => {
            let n = lower.strip_prefix('f')?.parse::<u8>().ok()?;
            if (1..=24).contains(&n) {
                KeyCode::F(n)
            } else {
                return None;
            }
        }
    };
    Some(code)
}

// ─── Semantic Key Actions ───────────────────────────────────────────────────

/// Semantic action resolved from key bindings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    // ── Navigation ──────────────────────────────────────────────────
    /// Move up / previous item.
    Up,
    /// Move down / next item.
    Down,
    /// Move left / collapse / parent.
    Left,
    /// Move right / expand / child.
    Right,
    /// Jump a page back.
    PageUp,
    /// Jump a page forward.
    PageDown,
    /// Jump to the first item.
    Home,
    /// Jump to the last item.
    End,

    // ── Interaction ─────────────────────────────────────────────────
    /// Confirm / select / commit.
    Confirm,
    /// Cancel / dismiss / revert.
    Cancel,
    /// Delete the character before the caret (or edit a search).
    DeleteBack,
    /// Delete the character after the caret.
    DeleteForward,

    // ── Search ──────────────────────────────────────────────────────
    /// Jump to the next typeahead match.
    NextMatch,
    /// Jump to the previous typeahead match.
    PreviousMatch,

    // ── Surface-specific ────────────────────────────────────────────
    /// Custom action defined by a concrete surface.
    Custom(String),
}

// ─── Keymap ─────────────────────────────────────────────────────────────────

/// Configurable keymap that resolves key events to semantic actions.
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: HashMap<(KeyCode, KeyModifiers), KeyAction>,
}

impl Keymap {
    /// Create a keymap with the default bindings.
    #[must_use]
    pub fn default_bindings() -> Self {
        let mut bindings = HashMap::new();
        let none = KeyModifiers::NONE;

        // Movement
        bindings.insert((KeyCode::Up, none), KeyAction::Up);
        bindings.insert((KeyCode::Down, none), KeyAction::Down);
        bindings.insert((KeyCode::Left, none), KeyAction::Left);
        bindings.insert((KeyCode::Right, none), KeyAction::Right);

        // Page navigation
        bindings.insert((KeyCode::PageUp, none), KeyAction::PageUp);
        bindings.insert((KeyCode::PageDown, none), KeyAction::PageDown);
        bindings.insert((KeyCode::Home, none), KeyAction::Home);
        bindings.insert((KeyCode::End, none), KeyAction::End);

        // Interaction
        bindings.insert((KeyCode::Enter, none), KeyAction::Confirm);
        bindings.insert((KeyCode::Esc, none), KeyAction::Cancel);
        bindings.insert((KeyCode::Backspace, none), KeyAction::DeleteBack);
        bindings.insert((KeyCode::Delete, none), KeyAction::DeleteForward);

        // Match cycling
        bindings.insert((KeyCode::Down, KeyModifiers::CONTROL), KeyAction::NextMatch);
        bindings.insert((KeyCode::Up, KeyModifiers::CONTROL), KeyAction::PreviousMatch);

        Self { bindings }
    }

    /// Resolve a key to a semantic action.
    #[must_use]
    pub fn resolve(&self, key: KeyCode, modifiers: KeyModifiers) -> Option<&KeyAction> {
        self.bindings
            .get(&(key, modifiers.intersection(TRACKED_MODIFIERS)))
    }

    /// Resolve an event to a semantic action.
    #[must_use]
    pub fn resolve_event(&self, event: &KeyEvent) -> Option<&KeyAction> {
        self.resolve(event.code, event.modifiers)
    }

    /// Add or override a binding.
    pub fn bind(&mut self, key: KeyCode, modifiers: KeyModifiers, action: KeyAction) {
        self.bindings
            .insert((key, modifiers.intersection(TRACKED_MODIFIERS)), action);
    }

    /// Add or override a binding from a chord.
    pub fn bind_chord(&mut self, chord: KeyChord, action: KeyAction) {
        self.bindings.insert((chord.code, chord.modifiers), action);
    }

    /// Remove a binding.
    pub fn unbind(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        self.bindings
            .remove(&(key, modifiers.intersection(TRACKED_MODIFIERS)));
    }

    /// Number of active bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the keymap is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::default_bindings()
    }
}
