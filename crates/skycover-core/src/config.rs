#![forbid(unsafe_code)]

//! Session configuration.
//!
//! Hosts hand the configuration over as JSON (the constructor option of the
//! web binding, or a file for the replay harness). Every field has a default,
//! so `{}` is a valid configuration.

use core::time::Duration;

use serde::{Deserialize, Serialize};

/// Default secret code typed to reveal the resources panel.
pub const DEFAULT_SECRET_CODE: &str = "weather";
/// Class token carried by trigger-word elements.
pub const DEFAULT_TRIGGER_MARKER: &str = "trigger-word";
pub const DEFAULT_COVER_TITLE: &str = "Weather Forecast";
pub const DEFAULT_REVEALED_TITLE: &str = "Local Weather Forecast";
pub const DEFAULT_BASE_PATH: &str = "/";
/// Neutral destinations for quick exit.
pub const DEFAULT_EXIT_TARGETS: [&str; 4] = [
    "https://weather.gov",
    "https://weather.com",
    "https://accuweather.com",
    "https://wunderground.com",
];
pub const DEFAULT_HISTORY_PADDING: u8 = 5;
const MAX_HISTORY_PADDING: u8 = 32;
pub const DEFAULT_COPY_ACK_MS: u64 = 2_000;
pub const DEFAULT_HISTORY_ACK_MS: u64 = 3_000;

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    Parse(String),
    /// A field holds a value the session cannot work with.
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::Invalid { field, reason } => write!(f, "invalid config `{field}`: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Document titles for each disguise state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleConfig {
    pub cover: String,
    pub revealed: String,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            cover: DEFAULT_COVER_TITLE.to_string(),
            revealed: DEFAULT_REVEALED_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisguiseConfig {
    pub secret_code: String,
    pub trigger_marker: String,
    pub titles: TitleConfig,
    /// Clean path written into history on scrub and quick exit.
    pub base_path: String,
    /// Allow-list the quick-exit destination is drawn from.
    pub exit_targets: Vec<String>,
    /// Number of history entries pushed before leaving.
    pub history_padding: u8,
    pub copy_ack_ms: u64,
    pub history_ack_ms: u64,
}

impl Default for DisguiseConfig {
    fn default() -> Self {
        Self {
            secret_code: DEFAULT_SECRET_CODE.to_string(),
            trigger_marker: DEFAULT_TRIGGER_MARKER.to_string(),
            titles: TitleConfig::default(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            exit_targets: DEFAULT_EXIT_TARGETS.iter().map(|s| s.to_string()).collect(),
            history_padding: DEFAULT_HISTORY_PADDING,
            copy_ack_ms: DEFAULT_COPY_ACK_MS,
            history_ack_ms: DEFAULT_HISTORY_ACK_MS,
        }
    }
}

impl DisguiseConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(s).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_code.is_empty() {
            return Err(invalid("secret_code", "must not be empty"));
        }
        if self.secret_code.chars().any(char::is_whitespace) {
            return Err(invalid("secret_code", "must not contain whitespace"));
        }
        if self.trigger_marker.is_empty() || self.trigger_marker.chars().any(char::is_whitespace)
        {
            return Err(invalid("trigger_marker", "must be a single class token"));
        }
        if !self.base_path.starts_with('/') {
            return Err(invalid("base_path", "must start with '/'"));
        }
        if self.exit_targets.is_empty() {
            return Err(invalid("exit_targets", "must not be empty"));
        }
        if !self
            .exit_targets
            .iter()
            .all(|url| url.len() > "https://".len() && url.starts_with("https://"))
        {
            return Err(invalid("exit_targets", "every target must be an https URL"));
        }
        if !(1..=MAX_HISTORY_PADDING).contains(&self.history_padding) {
            return Err(invalid("history_padding", "must be between 1 and 32"));
        }
        Ok(())
    }

    #[must_use]
    pub const fn copy_ack(&self) -> Duration {
        Duration::from_millis(self.copy_ack_ms)
    }

    #[must_use]
    pub const fn history_ack(&self) -> Duration {
        Duration::from_millis(self.history_ack_ms)
    }
}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
