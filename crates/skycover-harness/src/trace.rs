#![forbid(unsafe_code)]

//! JSONL trace format.
//!
//! ```text
//! {"at_ms":0,"event":{"kind":"key","phase":"down","key":"w"}}
//! {"at_ms":900,"event":{"kind":"double_click","class_name":"trigger-word"}}
//! {"at_ms":1500,"action":"quick_exit"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use serde::{Deserialize, Serialize};
use skycover_core::input::{InputEvent, InputEventJson};

/// Panel actions that are not DOM events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceAction {
    Close,
    QuickExit,
    ClearHistory,
    DismissWelcome,
}

/// One line of a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Milliseconds since page load.
    pub at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<InputEventJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<TraceAction>,
}

impl TraceStep {
    #[must_use]
    pub fn event(at_ms: u64, event: &InputEvent) -> Self {
        Self {
            at_ms,
            event: Some(event.into()),
            action: None,
        }
    }

    #[must_use]
    pub const fn action(at_ms: u64, action: TraceAction) -> Self {
        Self {
            at_ms,
            event: None,
            action: Some(action),
        }
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Trace parse failure. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    Json { line: usize, message: String },
    /// A step must carry exactly one of `event` or `action`.
    Shape { line: usize },
    /// Timestamps must not decrease.
    Backwards { line: usize, at_ms: u64, previous_ms: u64 },
}

impl core::fmt::Display for TraceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json { line, message } => write!(f, "line {line}: {message}"),
            Self::Shape { line } => {
                write!(f, "line {line}: expected exactly one of `event` or `action`")
            }
            Self::Backwards {
                line,
                at_ms,
                previous_ms,
            } => write!(
                f,
                "line {line}: at_ms {at_ms} is earlier than previous step ({previous_ms})"
            ),
        }
    }
}

impl std::error::Error for TraceError {}

pub fn parse_trace(text: &str) -> Result<Vec<TraceStep>, TraceError> {
    let mut steps = Vec::new();
    let mut previous_ms = 0;
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let step: TraceStep = serde_json::from_str(trimmed).map_err(|err| TraceError::Json {
            line,
            message: err.to_string(),
        })?;
        if step.event.is_some() == step.action.is_some() {
            return Err(TraceError::Shape { line });
        }
        if step.at_ms < previous_ms {
            return Err(TraceError::Backwards {
                line,
                at_ms: step.at_ms,
                previous_ms,
            });
        }
        previous_ms = step.at_ms;
        steps.push(step);
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use skycover_core::input::{KeyCode, KeyInput};

    #[test]
    fn parses_events_and_actions() {
        let text = r#"
# reveal then leave
{"at_ms":0,"event":{"kind":"double_click","class_name":"trigger-word"}}
{"at_ms":40,"action":"quick_exit"}
"#;
        let steps = parse_trace(text).expect("trace");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1], TraceStep::action(40, TraceAction::QuickExit));
    }

    #[test]
    fn step_serializes_back() {
        let step = TraceStep::event(7, &InputEvent::Key(KeyInput::down(KeyCode::Escape)));
        let line = step.to_json_string().expect("json");
        assert_eq!(parse_trace(&line), Ok(vec![step]));
    }

    #[test]
    fn rejects_both_or_neither() {
        let both = r#"{"at_ms":0,"event":{"kind":"unload"},"action":"close"}"#;
        assert_eq!(parse_trace(both), Err(TraceError::Shape { line: 1 }));
        assert_eq!(
            parse_trace(r#"{"at_ms":0}"#),
            Err(TraceError::Shape { line: 1 })
        );
    }

    #[test]
    fn rejects_time_going_backwards() {
        let text = "{\"at_ms\":10,\"action\":\"close\"}\n{\"at_ms\":5,\"action\":\"close\"}";
        assert_eq!(
            parse_trace(text),
            Err(TraceError::Backwards {
                line: 2,
                at_ms: 5,
                previous_ms: 10
            })
        );
    }

    #[test]
    fn reports_bad_json_line() {
        let err = parse_trace("\n{oops").expect_err("bad json");
        assert!(matches!(err, TraceError::Json { line: 2, .. }));
    }
}
