#![forbid(unsafe_code)]

//! Host effects seam.
//!
//! The state machine never touches the DOM. Every side effect goes through
//! [`Environment`], which `skycover-web` implements over `web-sys` and which
//! [`RecordingEnvironment`] implements in memory for tests and the replay
//! harness.
//!
//! Each capability is fallible. Callers in this crate treat every failure as
//! recoverable: results are folded into reports and never propagated.

use std::collections::BTreeMap;

/// Which web storage area an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageArea {
    Local,
    Session,
}

impl StorageArea {
    pub const ALL: [Self; 2] = [Self::Local, Self::Session];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Local => "localStorage",
            Self::Session => "sessionStorage",
        }
    }
}

/// Failure reported by a host capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectError {
    /// The host object does not exist (no window, storage disabled, ...).
    Unavailable(&'static str),
    /// The host refused the operation (permissions, security policy).
    Denied(String),
    /// Any other host-side exception.
    Host(String),
}

impl core::fmt::Display for EffectError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unavailable(what) => write!(f, "unavailable: {what}"),
            Self::Denied(msg) => write!(f, "denied: {msg}"),
            Self::Host(msg) => write!(f, "host error: {msg}"),
        }
    }
}

impl std::error::Error for EffectError {}

/// Narrow capability set the disguise logic needs from its host.
pub trait Environment {
    /// Set `document.title`.
    fn set_title(&mut self, title: &str) -> Result<(), EffectError>;

    /// Push a new same-origin history entry at `path`.
    fn push_history(&mut self, path: &str) -> Result<(), EffectError>;

    /// Overwrite the current history entry with `path`.
    fn replace_history(&mut self, path: &str) -> Result<(), EffectError>;

    /// Remove every item from one storage area.
    fn clear_storage(&mut self, area: StorageArea) -> Result<(), EffectError>;

    /// List the keys currently held by one storage area.
    fn storage_keys(&mut self, area: StorageArea) -> Result<Vec<String>, EffectError>;

    /// Remove a single item from one storage area.
    fn remove_storage_item(&mut self, area: StorageArea, key: &str) -> Result<(), EffectError>;

    /// Raw `document.cookie` string (`"a=1; b=2"`).
    fn read_cookies(&mut self) -> Result<String, EffectError>;

    /// Assign one cookie string to `document.cookie`.
    fn write_cookie(&mut self, cookie: &str) -> Result<(), EffectError>;

    /// Leave the page without keeping it in session history
    /// (`location.replace`).
    fn navigate_replace(&mut self, url: &str) -> Result<(), EffectError>;

    /// Leave the page with a plain navigation (`location.assign`). Only used
    /// when [`navigate_replace`](Self::navigate_replace) fails.
    fn navigate_assign(&mut self, url: &str) -> Result<(), EffectError>;
}

// ---------------------------------------------------------------------------
// RecordingEnvironment
// ---------------------------------------------------------------------------

/// One capability invocation, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectCall {
    SetTitle(String),
    PushHistory(String),
    ReplaceHistory(String),
    ClearStorage(StorageArea),
    StorageKeys(StorageArea),
    RemoveStorageItem(StorageArea, String),
    ReadCookies,
    WriteCookie(String),
    NavigateReplace(String),
    NavigateAssign(String),
}

impl EffectCall {
    #[must_use]
    pub const fn is_navigation(&self) -> bool {
        matches!(self, Self::NavigateReplace(_) | Self::NavigateAssign(_))
    }
}

/// Which capabilities a [`RecordingEnvironment`] should fail.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FailurePlan {
    pub title: bool,
    pub history: bool,
    pub storage_clear: bool,
    pub storage_keys: bool,
    pub storage_remove: bool,
    pub cookies: bool,
    pub navigate_replace: bool,
    pub navigate_assign: bool,
}

impl FailurePlan {
    /// Every storage and cookie capability fails.
    #[must_use]
    pub const fn storage_always_throws() -> Self {
        Self {
            title: false,
            history: false,
            storage_clear: true,
            storage_keys: true,
            storage_remove: true,
            cookies: true,
            navigate_replace: false,
            navigate_assign: false,
        }
    }

    /// Everything except navigation fails.
    #[must_use]
    pub const fn all_but_navigation() -> Self {
        Self {
            title: true,
            history: true,
            storage_clear: true,
            storage_keys: true,
            storage_remove: true,
            cookies: true,
            navigate_replace: false,
            navigate_assign: false,
        }
    }
}

/// Snapshot of storage sizes taken when a navigation call arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationSnapshot {
    pub local_items: usize,
    pub session_items: usize,
    pub cookies: usize,
}

/// In-memory browser stand-in that records every call.
#[derive(Debug, Clone)]
pub struct RecordingEnvironment {
    calls: Vec<EffectCall>,
    failures: FailurePlan,
    title: String,
    history: Vec<String>,
    cursor: usize,
    local: BTreeMap<String, String>,
    session: BTreeMap<String, String>,
    cookies: BTreeMap<String, String>,
    navigated_to: Option<String>,
    navigations: usize,
    at_navigation: Option<NavigationSnapshot>,
}

impl Default for RecordingEnvironment {
    fn default() -> Self {
        Self::new("/")
    }
}

impl RecordingEnvironment {
    /// Start with a single history entry at `location`.
    #[must_use]
    pub fn new(location: &str) -> Self {
        Self {
            calls: Vec::new(),
            failures: FailurePlan::default(),
            title: String::new(),
            history: vec![location.to_string()],
            cursor: 0,
            local: BTreeMap::new(),
            session: BTreeMap::new(),
            cookies: BTreeMap::new(),
            navigated_to: None,
            navigations: 0,
            at_navigation: None,
        }
    }

    #[must_use]
    pub fn with_failures(mut self, failures: FailurePlan) -> Self {
        self.failures = failures;
        self
    }

    #[must_use]
    pub fn with_item(mut self, area: StorageArea, key: &str, value: &str) -> Self {
        self.area_mut(area).insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    pub fn set_failures(&mut self, failures: FailurePlan) {
        self.failures = failures;
    }

    #[must_use]
    pub fn calls(&self) -> &[EffectCall] {
        &self.calls
    }

    /// Forget the recorded calls, keeping simulated browser state.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Current history entry.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.history[self.cursor]
    }

    /// All entries of the simulated session history.
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    #[must_use]
    pub fn item_count(&self, area: StorageArea) -> usize {
        match area {
            StorageArea::Local => self.local.len(),
            StorageArea::Session => self.session.len(),
        }
    }

    #[must_use]
    pub fn cookie_count(&self) -> usize {
        self.cookies.len()
    }

    #[must_use]
    pub fn navigated_to(&self) -> Option<&str> {
        self.navigated_to.as_deref()
    }

    /// Storage sizes observed by the first navigation call.
    #[must_use]
    pub fn navigation_snapshot(&self) -> Option<NavigationSnapshot> {
        self.at_navigation
    }

    /// Number of navigation calls that succeeded.
    #[must_use]
    pub fn navigation_count(&self) -> usize {
        self.navigations
    }

    fn area_mut(&mut self, area: StorageArea) -> &mut BTreeMap<String, String> {
        match area {
            StorageArea::Local => &mut self.local,
            StorageArea::Session => &mut self.session,
        }
    }

    fn check(failing: bool, what: &str) -> Result<(), EffectError> {
        if failing {
            Err(EffectError::Denied(format!("{what} rejected")))
        } else {
            Ok(())
        }
    }

    fn leave(&mut self, url: &str) {
        if self.at_navigation.is_none() {
            self.at_navigation = Some(NavigationSnapshot {
                local_items: self.local.len(),
                session_items: self.session.len(),
                cookies: self.cookies.len(),
            });
        }
        self.navigated_to = Some(url.to_string());
        self.navigations += 1;
    }
}

impl Environment for RecordingEnvironment {
    fn set_title(&mut self, title: &str) -> Result<(), EffectError> {
        self.calls.push(EffectCall::SetTitle(title.to_string()));
        Self::check(self.failures.title, "title")?;
        self.title = title.to_string();
        Ok(())
    }

    fn push_history(&mut self, path: &str) -> Result<(), EffectError> {
        self.calls.push(EffectCall::PushHistory(path.to_string()));
        Self::check(self.failures.history, "pushState")?;
        self.history.truncate(self.cursor + 1);
        self.history.push(path.to_string());
        self.cursor = self.history.len() - 1;
        Ok(())
    }

    fn replace_history(&mut self, path: &str) -> Result<(), EffectError> {
        self.calls.push(EffectCall::ReplaceHistory(path.to_string()));
        Self::check(self.failures.history, "replaceState")?;
        self.history[self.cursor] = path.to_string();
        Ok(())
    }

    fn clear_storage(&mut self, area: StorageArea) -> Result<(), EffectError> {
        self.calls.push(EffectCall::ClearStorage(area));
        Self::check(self.failures.storage_clear, area.name())?;
        self.area_mut(area).clear();
        Ok(())
    }

    fn storage_keys(&mut self, area: StorageArea) -> Result<Vec<String>, EffectError> {
        self.calls.push(EffectCall::StorageKeys(area));
        Self::check(self.failures.storage_keys, area.name())?;
        Ok(self.area_mut(area).keys().cloned().collect())
    }

    fn remove_storage_item(&mut self, area: StorageArea, key: &str) -> Result<(), EffectError> {
        self.calls
            .push(EffectCall::RemoveStorageItem(area, key.to_string()));
        Self::check(self.failures.storage_remove, area.name())?;
        self.area_mut(area).remove(key);
        Ok(())
    }

    fn read_cookies(&mut self) -> Result<String, EffectError> {
        self.calls.push(EffectCall::ReadCookies);
        Self::check(self.failures.cookies, "document.cookie")?;
        Ok(self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; "))
    }

    fn write_cookie(&mut self, cookie: &str) -> Result<(), EffectError> {
        self.calls.push(EffectCall::WriteCookie(cookie.to_string()));
        Self::check(self.failures.cookies, "document.cookie")?;
        let mut parts = cookie.split(';');
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return Err(EffectError::Host(format!("malformed cookie: {cookie}")));
        };
        let expired = parts.any(|attr| {
            attr.trim()
                .strip_prefix("expires=")
                .is_some_and(|date| date.contains("1970"))
        });
        if expired {
            self.cookies.remove(name.trim());
        } else {
            self.cookies
                .insert(name.trim().to_string(), value.to_string());
        }
        Ok(())
    }

    fn navigate_replace(&mut self, url: &str) -> Result<(), EffectError> {
        self.calls.push(EffectCall::NavigateReplace(url.to_string()));
        Self::check(self.failures.navigate_replace, "location.replace")?;
        self.leave(url);
        self.history[self.cursor] = url.to_string();
        Ok(())
    }

    fn navigate_assign(&mut self, url: &str) -> Result<(), EffectError> {
        self.calls.push(EffectCall::NavigateAssign(url.to_string()));
        Self::check(self.failures.navigate_assign, "location.assign")?;
        self.leave(url);
        self.history.truncate(self.cursor + 1);
        self.history.push(url.to_string());
        self.cursor = self.history.len() - 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_cookie_write_removes_cookie() {
        let mut env = RecordingEnvironment::default().with_cookie("sid", "abc");
        env.write_cookie("sid=;expires=Thu, 01 Jan 1970 00:00:00 GMT;path=/")
            .expect("write");
        assert_eq!(env.cookie_count(), 0);
    }

    #[test]
    fn push_truncates_forward_entries() {
        let mut env = RecordingEnvironment::new("/a");
        env.push_history("/b").expect("push");
        env.replace_history("/c").expect("replace");
        assert_eq!(env.history(), ["/a".to_string(), "/c".to_string()]);
        assert_eq!(env.location(), "/c");
    }

    #[test]
    fn replace_navigation_drops_current_entry() {
        let mut env = RecordingEnvironment::new("/?panel=1");
        env.navigate_replace("https://weather.gov").expect("navigate");
        assert_eq!(env.history(), ["https://weather.gov".to_string()]);
        assert_eq!(env.navigation_count(), 1);
    }

    #[test]
    fn failure_plan_is_honoured_and_recorded() {
        let mut env = RecordingEnvironment::default()
            .with_item(StorageArea::Local, "k", "v")
            .with_failures(FailurePlan::storage_always_throws());
        assert!(env.clear_storage(StorageArea::Local).is_err());
        assert_eq!(env.item_count(StorageArea::Local), 1);
        assert_eq!(env.calls(), [EffectCall::ClearStorage(StorageArea::Local)]);
    }

    #[test]
    fn navigation_snapshot_captures_storage_state() {
        let mut env = RecordingEnvironment::default().with_item(StorageArea::Session, "k", "v");
        env.navigate_replace("https://weather.com").expect("navigate");
        let seen = env.navigation_snapshot().expect("navigated");
        assert_eq!(seen.session_items, 1);
    }

    #[test]
    fn effect_error_display() {
        assert_eq!(
            EffectError::Unavailable("window").to_string(),
            "unavailable: window"
        );
    }
}
