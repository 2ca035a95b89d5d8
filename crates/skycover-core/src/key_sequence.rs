#![forbid(unsafe_code)]

//! Sliding-window secret-code matcher.
//!
//! Every key-down is recorded as a token (see [`KeyCode::to_token`]) in a
//! fixed-capacity window whose capacity equals the secret code length. After
//! each push the window is compared against the code.
//!
//! # Invariants
//! 1. `len() <= capacity()` at all times; the oldest token is evicted first.
//! 2. A match requires every slot to equal the corresponding code character,
//!    so a window that is not yet full never matches.
//! 3. The window is not cleared on a match; it keeps sliding.
//!
//! [`KeyCode::to_token`]: crate::input::KeyCode::to_token

use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// SecretCode
// ---------------------------------------------------------------------------

/// Case-normalized secret code, stored one token per character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretCode {
    tokens: Vec<String>,
}

impl SecretCode {
    /// Build a code from its textual form. The text is lowercased.
    #[must_use]
    pub fn new(code: &str) -> Self {
        Self {
            tokens: code
                .chars()
                .map(|c| c.to_lowercase().collect::<String>())
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn matches<'a>(&self, window: impl ExactSizeIterator<Item = &'a String>) -> bool {
        window.len() == self.tokens.len() && window.zip(&self.tokens).all(|(a, b)| a == b)
    }
}

impl Default for SecretCode {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SECRET_CODE)
    }
}

// ---------------------------------------------------------------------------
// KeySequenceBuffer
// ---------------------------------------------------------------------------

/// Fixed-capacity FIFO window of recently pressed key tokens.
#[derive(Clone)]
pub struct KeySequenceBuffer {
    code: SecretCode,
    window: VecDeque<String>,
}

impl std::fmt::Debug for KeySequenceBuffer {
    // Pressed keys are deliberately not printed.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySequenceBuffer")
            .field("len", &self.window.len())
            .field("capacity", &self.code.len())
            .finish()
    }
}

impl KeySequenceBuffer {
    #[must_use]
    pub fn new(code: SecretCode) -> Self {
        let capacity = code.len();
        Self {
            code,
            window: VecDeque::with_capacity(capacity),
        }
    }

    /// Record one token and report whether the window now spells the code.
    ///
    /// The token is lowercased before it is stored.
    pub fn push(&mut self, token: &str) -> bool {
        let capacity = self.code.len();
        if capacity == 0 {
            return false;
        }
        while self.window.len() >= capacity {
            self.window.pop_front();
        }
        self.window.push_back(token.to_lowercase());
        self.is_match()
    }

    /// Whether the current window equals the code.
    #[must_use]
    pub fn is_match(&self) -> bool {
        !self.code.is_empty() && self.code.matches(self.window.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.code.len()
    }

    /// Discard every recorded token.
    pub fn reset(&mut self) {
        self.window.clear();
    }

    /// Snapshot of the window, oldest first.
    #[must_use]
    pub fn tokens(&self) -> Vec<&str> {
        self.window.iter().map(String::as_str).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> KeySequenceBuffer {
        KeySequenceBuffer::new(SecretCode::new("weather"))
    }

    fn feed(buf: &mut KeySequenceBuffer, keys: &[&str]) -> Vec<bool> {
        keys.iter().map(|k| buf.push(k)).collect()
    }

    #[test]
    fn exact_code_matches_on_last_key_only() {
        let mut buf = buffer();
        let hits = feed(&mut buf, &["w", "e", "a", "t", "h", "e", "r"]);
        assert_eq!(hits, vec![false, false, false, false, false, false, true]);
    }

    #[test]
    fn one_wrong_position_never_matches() {
        let mut buf = buffer();
        let hits = feed(&mut buf, &["w", "e", "a", "t", "h", "e", "x"]);
        assert!(hits.iter().all(|hit| !hit));
    }

    #[test]
    fn uppercase_input_matches() {
        let mut buf = buffer();
        let hits = feed(&mut buf, &["W", "E", "A", "T", "H", "E", "R"]);
        assert_eq!(hits.last(), Some(&true));
    }

    #[test]
    fn uppercase_code_is_normalized() {
        let mut buf = KeySequenceBuffer::new(SecretCode::new("WeAtHeR"));
        let hits = feed(&mut buf, &["w", "e", "a", "t", "h", "e", "r"]);
        assert_eq!(hits.last(), Some(&true));
    }

    #[test]
    fn match_after_noise_prefix() {
        let mut buf = buffer();
        feed(&mut buf, &["x", "shift", "q", "escape"]);
        let hits = feed(&mut buf, &["w", "e", "a", "t", "h", "e", "r"]);
        assert_eq!(hits.last(), Some(&true));
    }

    #[test]
    fn modifier_inside_code_breaks_match() {
        let mut buf = buffer();
        let hits = feed(&mut buf, &["w", "e", "shift", "a", "t", "h", "e", "r"]);
        assert!(hits.iter().all(|hit| !hit));
    }

    #[test]
    fn window_is_not_cleared_on_match() {
        let mut buf = buffer();
        feed(&mut buf, &["w", "e", "a", "t", "h", "e", "r"]);
        assert_eq!(buf.len(), 7);
        assert!(buf.is_match());
        assert!(!buf.push("s"));
        assert_eq!(buf.tokens(), vec!["e", "a", "t", "h", "e", "r", "s"]);
    }

    #[test]
    fn length_is_capped_at_code_length() {
        let mut buf = buffer();
        for _ in 0..100 {
            buf.push("z");
            assert!(buf.len() <= buf.capacity());
        }
        assert_eq!(buf.len(), 7);
    }

    #[test]
    fn empty_code_never_matches() {
        let mut buf = KeySequenceBuffer::new(SecretCode::new(""));
        assert!(!buf.push("w"));
        assert!(buf.is_empty());
    }

    #[test]
    fn reset_clears_window() {
        let mut buf = buffer();
        feed(&mut buf, &["w", "e"]);
        buf.reset();
        assert!(buf.is_empty());
    }

    #[test]
    fn debug_format_hides_keys() {
        let mut buf = buffer();
        buf.push("w");
        let dbg = format!("{buf:?}");
        assert!(dbg.contains("KeySequenceBuffer"));
        assert!(!dbg.contains("\"w\""));
    }
}
