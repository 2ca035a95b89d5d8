#![forbid(unsafe_code)]

//! Quick exit: purge, pad history, leave.
//!
//! The sequence is fixed:
//! 1. purge storage and cookies ([`purge_traces`]),
//! 2. push `padding` entries at the base path so "back" lands on neutral
//!    ground,
//! 3. replace the current document with the exit target.
//!
//! Steps 1 and 2 are best effort and can never stop step 3. If
//! `location.replace` is rejected, a plain `location.assign` is attempted.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::effects::Environment;
use crate::scrubber::{PurgeReport, StepOutcome, purge_traces};

/// Destination chosen once per session from the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuickExitTarget(String);

impl QuickExitTarget {
    /// Pick one target uniformly at random. Returns `None` for an empty list.
    pub fn choose<R: Rng + ?Sized>(allow_list: &[String], rng: &mut R) -> Option<Self> {
        allow_list.choose(rng).cloned().map(Self)
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.0
    }
}

/// How the page was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// `location.replace` succeeded; the page is gone from session history.
    Replaced,
    /// Fallback `location.assign` succeeded.
    Assigned,
    /// Both primitives were rejected.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitReport {
    pub purge: PurgeReport,
    /// Number of padding entries actually pushed.
    pub padding_pushed: u8,
    pub navigation: NavigationOutcome,
    pub target: QuickExitTarget,
}

/// The exit controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickExit {
    base_path: String,
    padding: u8,
}

impl QuickExit {
    #[must_use]
    pub fn new(base_path: impl Into<String>, padding: u8) -> Self {
        Self {
            base_path: base_path.into(),
            padding,
        }
    }

    /// Run the exit sequence. Never returns early before navigating.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub fn run<E: Environment + ?Sized>(&self, env: &mut E, target: &QuickExitTarget) -> ExitReport {
        let mut purge = purge_traces(env);

        let mut padding_pushed = 0u8;
        for _ in 0..self.padding {
            if env.push_history(&self.base_path).is_ok() {
                padding_pushed += 1;
            }
        }
        purge.history = if padding_pushed == self.padding {
            StepOutcome::Done
        } else {
            StepOutcome::Failed
        };

        let navigation = match env.navigate_replace(target.url()) {
            Ok(()) => NavigationOutcome::Replaced,
            Err(err) => {
                crate::warn!(error = %err, "location.replace rejected, falling back to assign");
                match env.navigate_assign(target.url()) {
                    Ok(()) => NavigationOutcome::Assigned,
                    Err(_) => NavigationOutcome::Failed,
                }
            }
        };
        crate::info!(?navigation, padding_pushed, "quick exit issued");

        ExitReport {
            purge,
            padding_pushed,
            navigation,
            target: target.clone(),
        }
    }
}
