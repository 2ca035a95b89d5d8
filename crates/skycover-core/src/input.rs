#![forbid(unsafe_code)]

//! Host input schema.
//!
//! The web host (JS or the `skycover-web` binding) forwards raw DOM events.
//! This module focuses on:
//! - stable key normalization (DOM `key`/`code` → [`KeyCode`]),
//! - the token form recorded by the secret-code buffer, and
//! - a JSON encoding used by hosts that forward events as JSON and by the
//!   replay harness.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Modifier keys held during an input event.
    ///
    /// These flags are encoded as a compact `u8` bitset in JSON (`mods`).
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const SUPER = 0b1000;
    }
}

impl Modifiers {
    #[must_use]
    pub const fn from_bits_truncate_u8(bits: u8) -> Self {
        Self::from_bits_truncate(bits)
    }

    /// Build the set from the four DOM boolean flags.
    #[must_use]
    pub fn from_dom_flags(shift: bool, alt: bool, ctrl: bool, meta: bool) -> Self {
        let mut mods = Self::empty();
        mods.set(Self::SHIFT, shift);
        mods.set(Self::ALT, alt);
        mods.set(Self::CTRL, ctrl);
        mods.set(Self::SUPER, meta);
        mods
    }

    /// Whether the key-down is a browser or OS shortcut rather than typing.
    ///
    /// Ctrl+Alt is how Windows reports AltGr, so it still counts as typing.
    #[must_use]
    pub fn is_shortcut(self) -> bool {
        self.contains(Self::SUPER) || (self.contains(Self::CTRL) && !self.contains(Self::ALT))
    }
}

/// Phase for key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPhase {
    Down,
    Up,
}

/// Normalized key code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Tab,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    F(u8),
    Unidentified { key: Box<str>, code: Box<str> },
}

impl KeyCode {
    /// Token recorded by the secret-code buffer.
    ///
    /// Characters are lowercased; every other key is recorded by its
    /// lowercased name, which can never equal a single code character.
    #[must_use]
    pub fn to_token(&self) -> String {
        match self {
            Self::Char(c) => c.to_lowercase().collect(),
            Self::Unidentified { key, code } => {
                let name = if key.is_empty() { code } else { key };
                name.to_lowercase()
            }
            other => other.name().to_lowercase(),
        }
    }

    /// DOM-style name of a non-character key.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Char(c) => c.to_string(),
            Self::Enter => "Enter".to_string(),
            Self::Escape => "Escape".to_string(),
            Self::Backspace => "Backspace".to_string(),
            Self::Tab => "Tab".to_string(),
            Self::Delete => "Delete".to_string(),
            Self::Home => "Home".to_string(),
            Self::End => "End".to_string(),
            Self::PageUp => "PageUp".to_string(),
            Self::PageDown => "PageDown".to_string(),
            Self::Up => "ArrowUp".to_string(),
            Self::Down => "ArrowDown".to_string(),
            Self::Left => "ArrowLeft".to_string(),
            Self::Right => "ArrowRight".to_string(),
            Self::F(n) => format!("F{n}"),
            Self::Unidentified { key, .. } => key.to_string(),
        }
    }
}

/// Normalized key input event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyInput {
    pub phase: KeyPhase,
    pub code: KeyCode,
    pub mods: Modifiers,
    pub repeat: bool,
}

impl KeyInput {
    /// Key-down with no modifiers.
    #[must_use]
    pub fn down(code: KeyCode) -> Self {
        Self {
            phase: KeyPhase::Down,
            code,
            mods: Modifiers::empty(),
            repeat: false,
        }
    }

    /// Token recorded by the secret-code buffer.
    ///
    /// Shortcut chords get a prefixed token so that Ctrl+W never counts as a
    /// typed `w`.
    #[must_use]
    pub fn token(&self) -> String {
        if !self.mods.is_shortcut() {
            return self.code.to_token();
        }
        let mut token = String::new();
        if self.mods.contains(Modifiers::CTRL) {
            token.push_str("ctrl+");
        }
        if self.mods.contains(Modifiers::SUPER) {
            token.push_str("meta+");
        }
        token.push_str(&self.code.to_token());
        token
    }
}

/// Double-click on some element; `class_name` is the target's raw
/// `className` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DoubleClickInput {
    pub class_name: Box<str>,
}

/// Normalized host input event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputEvent {
    Key(KeyInput),
    DoubleClick(DoubleClickInput),
    /// The page is being unloaded (`beforeunload`/`pagehide`).
    Unload,
}

/// Deterministic normalization of DOM key/code strings into a [`KeyCode`].
#[must_use]
pub fn normalize_dom_key_code(dom_key: &str, dom_code: &str) -> KeyCode {
    // Prefer the logical `key` for printable characters (already includes shift).
    let mut chars = dom_key.chars();
    if let Some(first) = chars.next()
        && chars.next().is_none()
    {
        return KeyCode::Char(first);
    }

    match dom_key {
        "Enter" => KeyCode::Enter,
        "Escape" | "Esc" => KeyCode::Escape,
        "Backspace" => KeyCode::Backspace,
        "Tab" => KeyCode::Tab,
        "Delete" => KeyCode::Delete,
        "Home" => KeyCode::Home,
        "End" => KeyCode::End,
        "PageUp" => KeyCode::PageUp,
        "PageDown" => KeyCode::PageDown,
        "ArrowUp" => KeyCode::Up,
        "ArrowDown" => KeyCode::Down,
        "ArrowLeft" => KeyCode::Left,
        "ArrowRight" => KeyCode::Right,
        "Spacebar" => KeyCode::Char(' '),
        _ => {
            if let Some(n) = parse_function_key(dom_key) {
                return KeyCode::F(n);
            }

            // Fallback to DOM `code` for keys whose `key` is unhelpful.
            if let Some(code) = key_code_from_dom_code(dom_code) {
                return code;
            }

            KeyCode::Unidentified {
                key: dom_key.into(),
                code: dom_code.into(),
            }
        }
    }
}

fn parse_function_key(s: &str) -> Option<u8> {
    let rest = s.strip_prefix('F')?;
    rest.parse::<u8>().ok().filter(|n| (1..=24).contains(n))
}

fn key_code_from_dom_code(dom_code: &str) -> Option<KeyCode> {
    Some(match dom_code {
        "Enter" | "NumpadEnter" => KeyCode::Enter,
        "Escape" => KeyCode::Escape,
        "Backspace" => KeyCode::Backspace,
        "Tab" => KeyCode::Tab,
        "Delete" => KeyCode::Delete,
        "ArrowUp" => KeyCode::Up,
        "ArrowDown" => KeyCode::Down,
        "ArrowLeft" => KeyCode::Left,
        "ArrowRight" => KeyCode::Right,
        _ => {
            return None;
        }
    })
}

/// JSON encoding of [`InputEvent`].
///
/// Key events carry the raw DOM strings; normalization happens on decode so
/// traces stay readable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEventJson {
    Key {
        phase: KeyPhase,
        key: String,
        #[serde(default)]
        code: String,
        #[serde(default)]
        mods: u8,
        #[serde(default)]
        repeat: bool,
    },
    DoubleClick {
        #[serde(default)]
        class_name: String,
    },
    Unload,
}

impl InputEvent {
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&InputEventJson::from(self))
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        let json: InputEventJson = serde_json::from_str(s)?;
        Ok(json.into())
    }
}

impl From<&InputEvent> for InputEventJson {
    fn from(value: &InputEvent) -> Self {
        match value {
            InputEvent::Key(key) => {
                let (dom_key, dom_code) = match &key.code {
                    KeyCode::Unidentified { key, code } => (key.to_string(), code.to_string()),
                    other => (other.name(), String::new()),
                };
                Self::Key {
                    phase: key.phase,
                    key: dom_key,
                    code: dom_code,
                    mods: key.mods.bits(),
                    repeat: key.repeat,
                }
            }
            InputEvent::DoubleClick(click) => Self::DoubleClick {
                class_name: click.class_name.to_string(),
            },
            InputEvent::Unload => Self::Unload,
        }
    }
}

impl From<InputEventJson> for InputEvent {
    fn from(value: InputEventJson) -> Self {
        match value {
            InputEventJson::Key {
                phase,
                key,
                code,
                mods,
                repeat,
            } => Self::Key(KeyInput {
                phase,
                code: normalize_dom_key_code(&key, &code),
                mods: Modifiers::from_bits_truncate_u8(mods),
                repeat,
            }),
            InputEventJson::DoubleClick { class_name } => Self::DoubleClick(DoubleClickInput {
                class_name: class_name.into(),
            }),
            InputEventJson::Unload => Self::Unload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_dom_key_specials() {
        assert_eq!(normalize_dom_key_code("Enter", "Enter"), KeyCode::Enter);
        assert_eq!(normalize_dom_key_code("Esc", ""), KeyCode::Escape);
        assert_eq!(
            normalize_dom_key_code("ArrowLeft", "ArrowLeft"),
            KeyCode::Left
        );
        assert_eq!(normalize_dom_key_code("F12", "F12"), KeyCode::F(12));
    }

    #[test]
    fn modifier_keys_stay_unidentified() {
        let code = normalize_dom_key_code("Shift", "ShiftLeft");
        assert_eq!(
            code,
            KeyCode::Unidentified {
                key: "Shift".into(),
                code: "ShiftLeft".into(),
            }
        );
        assert_eq!(code.to_token(), "shift");
    }

    #[test]
    fn char_tokens_are_lowercased() {
        assert_eq!(normalize_dom_key_code("W", "KeyW").to_token(), "w");
        assert_eq!(KeyCode::Escape.to_token(), "escape");
    }

    #[test]
    fn modifiers_from_dom_flags() {
        let mods = Modifiers::from_dom_flags(true, false, true, false);
        assert_eq!(mods, Modifiers::SHIFT | Modifiers::CTRL);
    }

    #[test]
    fn shortcut_chords_get_their_own_token() {
        let mut key = KeyInput::down(normalize_dom_key_code("w", "KeyW"));
        key.mods = Modifiers::CTRL;
        assert_eq!(key.token(), "ctrl+w");
        key.mods = Modifiers::SUPER | Modifiers::SHIFT;
        assert_eq!(key.token(), "meta+w");
    }

    #[test]
    fn shift_and_altgr_still_type() {
        let mut key = KeyInput::down(normalize_dom_key_code("W", "KeyW"));
        key.mods = Modifiers::SHIFT;
        assert_eq!(key.token(), "w");
        key.mods = Modifiers::CTRL | Modifiers::ALT;
        assert!(!key.mods.is_shortcut());
        assert_eq!(key.token(), "w");
    }

    #[test]
    fn focus_events_are_not_part_of_the_schema() {
        assert!(InputEvent::from_json_str(r#"{"kind":"focus","focused":true}"#).is_err());
    }

    #[test]
    fn key_event_json_decodes_raw_dom_strings() {
        let ev = InputEvent::from_json_str(r#"{"kind":"key","phase":"down","key":"E"}"#)
            .expect("deserialize");
        assert_eq!(ev, InputEvent::Key(KeyInput::down(KeyCode::Char('E'))));
    }

    #[test]
    fn double_click_json_is_stable() {
        let ev = InputEvent::DoubleClick(DoubleClickInput {
            class_name: "nav trigger-word".into(),
        });
        let j1 = ev.to_json_string().expect("serialize");
        let j2 = ev.to_json_string().expect("serialize");
        assert_eq!(j1, j2);
        assert_eq!(InputEvent::from_json_str(&j1).expect("deserialize"), ev);
    }

    #[test]
    fn unload_json() {
        let ev = InputEvent::from_json_str(r#"{"kind":"unload"}"#).expect("deserialize");
        assert_eq!(ev, InputEvent::Unload);
    }
}
