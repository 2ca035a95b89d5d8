#![forbid(unsafe_code)]

//! Best-effort removal of local traces of the visit.
//!
//! A scrub runs three independent steps:
//! 1. empty `localStorage` and `sessionStorage`,
//! 2. expire every cookie visible to the page,
//! 3. overwrite the current history entry with the clean base path.
//!
//! A failing step never prevents the next one from running, and no error
//! leaves this module; outcomes are collected into a [`PurgeReport`].

use serde::Serialize;

use crate::effects::{EffectError, Environment, StorageArea};

/// Attribute suffix that makes the browser drop a cookie immediately.
pub const COOKIE_EXPIRY_SUFFIX: &str = "=;expires=Thu, 01 Jan 1970 00:00:00 GMT;path=/";

/// Outcome of a single purge step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Done,
    Failed,
    /// The step was not part of this purge.
    Skipped,
}

impl StepOutcome {
    #[must_use]
    pub const fn is_ok(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// Per-step result of a purge, suitable for a "Cleared!" acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub local_storage: StepOutcome,
    pub session_storage: StepOutcome,
    pub cookies: StepOutcome,
    pub history: StepOutcome,
}

impl PurgeReport {
    #[must_use]
    pub const fn all_succeeded(&self) -> bool {
        self.local_storage.is_ok()
            && self.session_storage.is_ok()
            && self.cookies.is_ok()
            && self.history.is_ok()
    }
}

/// Runs the purge sequences against an [`Environment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryScrubber {
    base_path: String,
}

impl HistoryScrubber {
    #[must_use]
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Full scrub: storage, cookies, then `replaceState` to the base path.
    pub fn scrub<E: Environment + ?Sized>(&self, env: &mut E) -> PurgeReport {
        let mut report = purge_traces(env);
        report.history = outcome(env.replace_history(&self.base_path), "replace history");
        crate::info!(ok = report.all_succeeded(), "history scrub finished");
        report
    }
}

/// Storage and cookie steps only; history is reported as skipped.
pub fn purge_traces<E: Environment + ?Sized>(env: &mut E) -> PurgeReport {
    PurgeReport {
        local_storage: clear_area(env, StorageArea::Local),
        session_storage: clear_area(env, StorageArea::Session),
        cookies: expire_cookies(env),
        history: StepOutcome::Skipped,
    }
}

/// Clear one storage area, falling back to item-by-item removal when the
/// bulk `clear()` is rejected.
fn clear_area<E: Environment + ?Sized>(env: &mut E, area: StorageArea) -> StepOutcome {
    let Err(err) = env.clear_storage(area) else {
        return StepOutcome::Done;
    };
    note_failure(area.name(), &err);

    let keys = match env.storage_keys(area) {
        Ok(keys) => keys,
        Err(err) => {
            note_failure(area.name(), &err);
            return StepOutcome::Failed;
        }
    };
    let mut outcome = StepOutcome::Done;
    for key in keys {
        if let Err(err) = env.remove_storage_item(area, &key) {
            note_failure(area.name(), &err);
            outcome = StepOutcome::Failed;
        }
    }
    outcome
}

fn expire_cookies<E: Environment + ?Sized>(env: &mut E) -> StepOutcome {
    let raw = match env.read_cookies() {
        Ok(raw) => raw,
        Err(err) => {
            note_failure("document.cookie", &err);
            return StepOutcome::Failed;
        }
    };
    let mut outcome = StepOutcome::Done;
    for name in cookie_names(&raw) {
        if let Err(err) = env.write_cookie(&expired_cookie(name)) {
            note_failure("document.cookie", &err);
            outcome = StepOutcome::Failed;
        }
    }
    outcome
}

/// Cookie names found in a `document.cookie` string.
#[must_use]
pub fn cookie_names(raw: &str) -> Vec<&str> {
    raw.split(';')
        .map(|pair| pair.split('=').next().unwrap_or_default().trim())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Cookie string that expires `name` for the whole site.
#[must_use]
pub fn expired_cookie(name: &str) -> String {
    format!("{name}{COOKIE_EXPIRY_SUFFIX}")
}

fn outcome(result: Result<(), EffectError>, what: &str) -> StepOutcome {
    match result {
        Ok(()) => StepOutcome::Done,
        Err(err) => {
            note_failure(what, &err);
            StepOutcome::Failed
        }
    }
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn note_failure(what: &str, err: &EffectError) {
    crate::debug!(step = what, error = %err, "purge step failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{EffectCall, FailurePlan, RecordingEnvironment};
    use pretty_assertions::assert_eq;

    fn populated() -> RecordingEnvironment {
        RecordingEnvironment::new("/?q=shelter")
            .with_item(StorageArea::Local, "hasVisitedBefore", "true")
            .with_item(StorageArea::Session, "tab", "emergency")
            .with_cookie("sid", "1")
            .with_cookie("pref", "dark")
    }

    #[test]
    fn cookie_names_trim_and_skip_empty() {
        assert_eq!(cookie_names(" a=1; b=2;;c"), vec!["a", "b", "c"]);
        assert!(cookie_names("").is_empty());
    }

    #[test]
    fn scrub_clears_everything_and_replaces_history() {
        let mut env = populated();
        let report = HistoryScrubber::new("/").scrub(&mut env);
        assert!(report.all_succeeded());
        assert_eq!(env.item_count(StorageArea::Local), 0);
        assert_eq!(env.item_count(StorageArea::Session), 0);
        assert_eq!(env.cookie_count(), 0);
        assert_eq!(env.location(), "/");
        assert_eq!(env.history().len(), 1);
        assert!(
            !env.calls()
                .iter()
                .any(|c| matches!(c, EffectCall::PushHistory(_)))
        );
    }

    #[test]
    fn clear_failure_falls_back_to_item_removal() {
        let mut env = populated().with_failures(FailurePlan {
            storage_clear: true,
            ..FailurePlan::default()
        });
        let report = HistoryScrubber::new("/").scrub(&mut env);
        assert_eq!(report.local_storage, StepOutcome::Done);
        assert_eq!(env.item_count(StorageArea::Local), 0);
        assert!(env.calls().contains(&EffectCall::RemoveStorageItem(
            StorageArea::Local,
            "hasVisitedBefore".to_string()
        )));
    }

    #[test]
    fn failing_steps_do_not_abort_later_steps() {
        let mut env = populated().with_failures(FailurePlan::storage_always_throws());
        let report = HistoryScrubber::new("/").scrub(&mut env);
        assert_eq!(report.local_storage, StepOutcome::Failed);
        assert_eq!(report.session_storage, StepOutcome::Failed);
        assert_eq!(report.cookies, StepOutcome::Failed);
        assert_eq!(report.history, StepOutcome::Done);
        assert!(!report.all_succeeded());
        assert_eq!(env.location(), "/");
    }

    #[test]
    fn purge_traces_skips_history() {
        let mut env = populated();
        let report = purge_traces(&mut env);
        assert_eq!(report.history, StepOutcome::Skipped);
        assert!(report.all_succeeded());
        assert_eq!(env.location(), "/?q=shelter");
    }

    #[test]
    fn expired_cookie_format() {
        assert_eq!(
            expired_cookie("sid"),
            "sid=;expires=Thu, 01 Jan 1970 00:00:00 GMT;path=/"
        );
    }
}
