//! Input Capture and Normalization
//!
//! Maps raw key events from the host to engine actions. The adapter filters
//! out modifier-only presses, key repeats, pastes and shortcut chords, and
//! turns Enter/R/Space into start/restart/continue outside of play. During
//! play every printable character goes to the engine unchanged, including
//! spaces and `r`.

use serde::{Deserialize, Serialize};

use crate::game::state::GamePhase;

// =============================================================================
// INPUT TYPES
// =============================================================================

/// Logical key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyInput {
    Char(char),
    Enter,
    Backspace,
    Escape,
    /// Shift, Control, Alt, Meta, CapsLock and friends on their own
    Modifier,
    Other(String),
}

impl KeyInput {
    /// Parse a DOM-style key name (`"a"`, `"Enter"`, `"Shift"`).
    pub fn from_key_name(name: &str) -> Self {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return KeyInput::Char(c);
        }
        match name {
            "Enter" => KeyInput::Enter,
            "Backspace" => KeyInput::Backspace,
            "Escape" | "Esc" => KeyInput::Escape,
            "Spacebar" => KeyInput::Char(' '),
            "Shift" | "Control" | "Alt" | "AltGraph" | "Meta" | "CapsLock" | "Fn" | "OS" => {
                KeyInput::Modifier
            }
            other => KeyInput::Other(other.to_string()),
        }
    }
}

/// A key event as delivered by the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawKey {
    pub key: KeyInput,
    /// Auto-repeat from a held key
    #[serde(default)]
    pub repeat: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
    /// Text arriving from a paste
    #[serde(default)]
    pub paste: bool,
}

impl RawKey {
    pub fn new(key: KeyInput) -> Self {
        Self {
            key,
            repeat: false,
            ctrl: false,
            alt: false,
            meta: false,
            paste: false,
        }
    }

    pub fn char(c: char) -> Self {
        Self::new(KeyInput::Char(c))
    }

    pub fn named(name: &str) -> Self {
        Self::new(KeyInput::from_key_name(name))
    }

    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn pasted(mut self) -> Self {
        self.paste = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// Events that never reach the engine.
    ///
    /// Alt alone is allowed since some layouts type characters with it.
    pub fn is_filtered(&self) -> bool {
        self.repeat || self.paste || self.ctrl || self.meta || self.key == KeyInput::Modifier
    }
}

/// Engine-level action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputAction {
    Char(char),
    Backspace,
    Start,
    Restart,
    /// Dead -> results
    Continue,
    Ignore,
}

// =============================================================================
// MAPPING
// =============================================================================

/// Map a raw key to an action for the current phase.
pub fn map_key(phase: GamePhase, key: &RawKey) -> InputAction {
    if key.is_filtered() {
        return InputAction::Ignore;
    }

    match phase {
        GamePhase::Playing => match key.key {
            KeyInput::Char(c) => InputAction::Char(c),
            KeyInput::Backspace => InputAction::Backspace,
            _ => InputAction::Ignore,
        },
        GamePhase::Idle => match key.key {
            KeyInput::Enter | KeyInput::Char(' ') => InputAction::Start,
            _ => InputAction::Ignore,
        },
        GamePhase::Countdown { .. } => match key.key {
            KeyInput::Escape => InputAction::Restart,
            _ => InputAction::Ignore,
        },
        GamePhase::Dead => match key.key {
            KeyInput::Enter | KeyInput::Char(' ') => InputAction::Continue,
            KeyInput::Char('r') | KeyInput::Char('R') => InputAction::Restart,
            _ => InputAction::Ignore,
        },
        GamePhase::Results => match key.key {
            KeyInput::Enter | KeyInput::Char(' ') | KeyInput::Char('r') | KeyInput::Char('R') => {
                InputAction::Restart
            }
            _ => InputAction::Ignore,
        },
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(KeyInput::from_key_name("a"), KeyInput::Char('a'));
        assert_eq!(KeyInput::from_key_name(" "), KeyInput::Char(' '));
        assert_eq!(KeyInput::from_key_name("Enter"), KeyInput::Enter);
        assert_eq!(KeyInput::from_key_name("Shift"), KeyInput::Modifier);
        assert_eq!(KeyInput::from_key_name("Backspace"), KeyInput::Backspace);
        assert_eq!(
            KeyInput::from_key_name("ArrowLeft"),
            KeyInput::Other("ArrowLeft".to_string())
        );
    }

    #[test]
    fn test_playing_passes_characters_through() {
        let phase = GamePhase::Playing;
        assert_eq!(map_key(phase, &RawKey::char('r')), InputAction::Char('r'));
        assert_eq!(map_key(phase, &RawKey::char(' ')), InputAction::Char(' '));
        assert_eq!(map_key(phase, &RawKey::named("Backspace")), InputAction::Backspace);
        assert_eq!(map_key(phase, &RawKey::named("Enter")), InputAction::Ignore);
    }

    #[test]
    fn test_filters() {
        let phase = GamePhase::Playing;
        assert_eq!(map_key(phase, &RawKey::named("Shift")), InputAction::Ignore);
        assert_eq!(map_key(phase, &RawKey::char('a').repeated()), InputAction::Ignore);
        assert_eq!(map_key(phase, &RawKey::char('a').pasted()), InputAction::Ignore);
        assert_eq!(map_key(phase, &RawKey::char('c').with_ctrl()), InputAction::Ignore);

        let mut alt = RawKey::char('@');
        alt.alt = true;
        assert_eq!(map_key(phase, &alt), InputAction::Char('@'));
    }

    #[test]
    fn test_phase_controls() {
        assert_eq!(map_key(GamePhase::Idle, &RawKey::named("Enter")), InputAction::Start);
        assert_eq!(map_key(GamePhase::Idle, &RawKey::char(' ')), InputAction::Start);
        assert_eq!(map_key(GamePhase::Idle, &RawKey::char('a')), InputAction::Ignore);

        let countdown = GamePhase::Countdown { remaining: 2 };
        assert_eq!(map_key(countdown, &RawKey::char('a')), InputAction::Ignore);

        assert_eq!(map_key(GamePhase::Dead, &RawKey::named("Enter")), InputAction::Continue);
        assert_eq!(map_key(GamePhase::Dead, &RawKey::char('R')), InputAction::Restart);

        assert_eq!(map_key(GamePhase::Results, &RawKey::char('r')), InputAction::Restart);
        assert_eq!(map_key(GamePhase::Results, &RawKey::named("Enter")), InputAction::Restart);
        assert_eq!(map_key(GamePhase::Results, &RawKey::char('x')), InputAction::Ignore);
    }

    #[test]
    fn test_repeat_enter_does_not_restart() {
        let key = RawKey::named("Enter").repeated();
        assert_eq!(map_key(GamePhase::Results, &key), InputAction::Ignore);
    }
}
