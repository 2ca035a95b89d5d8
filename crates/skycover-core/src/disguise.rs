#![forbid(unsafe_code)]

//! Which face the page is showing.

use serde::Serialize;

use crate::config::TitleConfig;

/// Disguise state. The document title is a pure function of it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisguiseState {
    /// The weather cover is shown.
    #[default]
    Weather,
    /// The resources panel is shown.
    Resources,
}

impl DisguiseState {
    #[must_use]
    pub fn title(self, titles: &TitleConfig) -> &str {
        match self {
            Self::Weather => &titles.cover,
            Self::Resources => &titles.revealed,
        }
    }

    #[must_use]
    pub const fn is_revealed(self) -> bool {
        matches!(self, Self::Resources)
    }
}

/// Result of feeding one event or action to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    None,
    Revealed,
    Hidden,
    /// Quick exit ran; the session is terminal.
    Exited,
    /// Unload purge ran.
    Unloaded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_follows_state() {
        let titles = TitleConfig::default();
        assert_eq!(DisguiseState::Weather.title(&titles), "Weather Forecast");
        assert_eq!(
            DisguiseState::Resources.title(&titles),
            "Local Weather Forecast"
        );
    }

    #[test]
    fn default_is_weather() {
        assert!(!DisguiseState::default().is_revealed());
    }
}
