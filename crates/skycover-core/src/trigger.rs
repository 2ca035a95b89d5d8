#![forbid(unsafe_code)]

//! Reveal and dismiss gestures.
//!
//! Two independent gestures reveal the resources panel:
//! - typing the secret code anywhere on the page,
//! - double-clicking an element tagged with the trigger marker class.
//!
//! Escape asks for the panel to be dismissed. The detector only classifies
//! input; [`DisguiseSession`](crate::session::DisguiseSession) decides what a
//! signal means in the current state.

use crate::input::{KeyCode, KeyInput, KeyPhase};
use crate::key_sequence::{KeySequenceBuffer, SecretCode};

/// What an input gesture asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerSignal {
    Reveal,
    Dismiss,
    None,
}

/// Class token that marks trigger words ("Safety", "Support").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMarker(String);

impl TriggerMarker {
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self(class.into())
    }

    #[must_use]
    pub fn class(&self) -> &str {
        &self.0
    }

    /// Whether a raw `className` value carries the marker as a whole token.
    #[must_use]
    pub fn is_marked(&self, class_name: &str) -> bool {
        class_name.split_ascii_whitespace().any(|c| c == self.0)
    }
}

impl Default for TriggerMarker {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TRIGGER_MARKER)
    }
}

/// Classifies key-down and double-click input.
#[derive(Debug, Clone)]
pub struct TriggerDetector {
    keys: KeySequenceBuffer,
    marker: TriggerMarker,
}

impl TriggerDetector {
    #[must_use]
    pub fn new(code: SecretCode, marker: TriggerMarker) -> Self {
        Self {
            keys: KeySequenceBuffer::new(code),
            marker,
        }
    }

    /// Record a key event.
    ///
    /// Every key-down (auto-repeat included) is pushed into the window as
    /// [`KeyInput::token`]; key-up events are ignored. Escape yields [`TriggerSignal::Dismiss`] unless it
    /// also completes the code.
    pub fn on_key(&mut self, key: &KeyInput) -> TriggerSignal {
        if key.phase != KeyPhase::Down {
            return TriggerSignal::None;
        }
        if self.keys.push(&key.token()) {
            return TriggerSignal::Reveal;
        }
        if key.code == KeyCode::Escape {
            return TriggerSignal::Dismiss;
        }
        TriggerSignal::None
    }

    /// Classify a double-click on an element with the given `className`.
    #[must_use]
    pub fn on_double_click(&self, class_name: &str) -> TriggerSignal {
        if self.marker.is_marked(class_name) {
            TriggerSignal::Reveal
        } else {
            TriggerSignal::None
        }
    }

    #[must_use]
    pub fn buffer(&self) -> &KeySequenceBuffer {
        &self.keys
    }

    #[must_use]
    pub fn marker(&self) -> &TriggerMarker {
        &self.marker
    }
}

impl Default for TriggerDetector {
    fn default() -> Self {
        Self::new(SecretCode::default(), TriggerMarker::default())
    }
}
