#![forbid(unsafe_code)]

//! Interaction state of the resources panel.
//!
//! Content (hotlines, links, reassurance text) belongs to the host page. This
//! module only tracks what the visitor has selected, expanded or dismissed,
//! plus short-lived acknowledgments driven by the host clock.

use core::str::FromStr;
use core::time::Duration;

use serde::Serialize;

/// Tabs of the resources panel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelTab {
    Emergency,
    Resources,
    Recovery,
    #[default]
    Reassurance,
    Donate,
    Secure,
}

impl PanelTab {
    pub const ALL: [Self; 6] = [
        Self::Emergency,
        Self::Resources,
        Self::Recovery,
        Self::Reassurance,
        Self::Donate,
        Self::Secure,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Resources => "resources",
            Self::Recovery => "recovery",
            Self::Reassurance => "reassurance",
            Self::Donate => "donate",
            Self::Secure => "secure",
        }
    }
}

/// Collapsible sections of the privacy guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Privacy,
    Links,
    Phone,
    History,
}

impl Section {
    pub const ALL: [Self; 4] = [Self::Privacy, Self::Links, Self::Phone, Self::History];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Privacy => "privacy",
            Self::Links => "links",
            Self::Phone => "phone",
            Self::History => "history",
        }
    }
}

/// A tab, section or choice name the panel does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownName(pub String);

impl core::fmt::Display for UnknownName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown name: {}", self.0)
    }
}

impl std::error::Error for UnknownName {}

impl FromStr for PanelTab {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tab| tab.name() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

impl FromStr for Section {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|section| section.name() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// Answer to the external-link warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkChoice {
    Continue,
    CopyInstead,
    Cancel,
}

impl FromStr for LinkChoice {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continue" => Ok(Self::Continue),
            "copy_instead" => Ok(Self::CopyInstead),
            "cancel" => Ok(Self::Cancel),
            other => Err(UnknownName(other.to_string())),
        }
    }
}

/// What the host should do after the link warning is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkResolution {
    /// Open the link in a new, unlinked window.
    Open(String),
    /// Dial: navigate the current window to this `tel:` URI.
    Call(String),
    /// Copy the link or number to the clipboard instead.
    Copy(String),
    Cancelled,
    /// No warning was pending.
    NothingPending,
}

/// `tel:` URI for a displayed phone number; only digits are kept.
#[must_use]
pub fn tel_uri(number: &str) -> String {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    format!("tel:{digits}")
}

/// A departure waiting on the privacy warning.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingLeave {
    Link(String),
    Call(String),
}

/// Serializable view of the panel for the host renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelSnapshot {
    pub tab: PanelTab,
    pub expanded: Vec<Section>,
    pub all_expanded: bool,
    pub privacy_notice: bool,
    pub copied: bool,
    pub history_cleared: bool,
    pub pending_link: Option<String>,
    /// Number awaiting the call-history warning, as displayed.
    pub pending_call: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePanel {
    tab: PanelTab,
    expanded: Vec<Section>,
    all_expanded: bool,
    privacy_notice: bool,
    copied_until: Option<Duration>,
    history_cleared_until: Option<Duration>,
    pending: Option<PendingLeave>,
}

impl Default for ResourcePanel {
    fn default() -> Self {
        Self {
            tab: PanelTab::default(),
            expanded: Vec::new(),
            all_expanded: false,
            privacy_notice: true,
            copied_until: None,
            history_cleared_until: None,
            pending: None,
        }
    }
}

impl ResourcePanel {
    #[must_use]
    pub const fn tab(&self) -> PanelTab {
        self.tab
    }

    pub fn select_tab(&mut self, tab: PanelTab) {
        self.tab = tab;
    }

    #[must_use]
    pub fn is_expanded(&self, section: Section) -> bool {
        self.expanded.contains(&section)
    }

    pub fn toggle_section(&mut self, section: Section) {
        if let Some(pos) = self.expanded.iter().position(|s| *s == section) {
            self.expanded.remove(pos);
        } else {
            self.expanded.push(section);
        }
        self.all_expanded = self.expanded.len() == Section::ALL.len();
    }

    /// Expand everything, or collapse everything when all are open.
    pub fn toggle_all(&mut self) {
        if self.all_expanded {
            self.expanded.clear();
            self.all_expanded = false;
        } else {
            self.expanded = Section::ALL.to_vec();
            self.all_expanded = true;
        }
    }

    pub fn dismiss_privacy_notice(&mut self) {
        self.privacy_notice = false;
    }

    /// A clipboard write succeeded at `now`.
    pub fn mark_copied(&mut self, now: Duration, ack: Duration) {
        self.copied_until = Some(now.saturating_add(ack));
    }

    pub fn mark_history_cleared(&mut self, now: Duration, ack: Duration) {
        self.history_cleared_until = Some(now.saturating_add(ack));
    }

    #[must_use]
    pub fn copied(&self, now: Duration) -> bool {
        self.copied_until.is_some_and(|until| now < until)
    }

    #[must_use]
    pub fn history_cleared(&self, now: Duration) -> bool {
        self.history_cleared_until.is_some_and(|until| now < until)
    }

    /// Drop expired acknowledgments. Returns whether anything changed.
    pub fn tick(&mut self, now: Duration) -> bool {
        let mut changed = false;
        for slot in [&mut self.copied_until, &mut self.history_cleared_until] {
            if slot.is_some_and(|until| now >= until) {
                *slot = None;
                changed = true;
            }
        }
        changed
    }

    /// Open the warning shown before leaving for an external resource.
    pub fn request_link(&mut self, url: impl Into<String>) {
        self.pending = Some(PendingLeave::Link(url.into()));
    }

    /// Open the call-history warning shown before dialing `number`.
    pub fn request_call(&mut self, number: impl Into<String>) {
        self.pending = Some(PendingLeave::Call(number.into()));
    }

    /// Answer whichever warning is pending.
    pub fn resolve_link(&mut self, choice: LinkChoice) -> LinkResolution {
        let Some(pending) = self.pending.take() else {
            return LinkResolution::NothingPending;
        };
        match (choice, pending) {
            (LinkChoice::Cancel, _) => LinkResolution::Cancelled,
            (LinkChoice::Continue, PendingLeave::Link(url)) => LinkResolution::Open(url),
            (LinkChoice::Continue, PendingLeave::Call(number)) => {
                LinkResolution::Call(tel_uri(&number))
            }
            (LinkChoice::CopyInstead, PendingLeave::Link(text) | PendingLeave::Call(text)) => {
                LinkResolution::Copy(text)
            }
        }
    }

    #[must_use]
    pub fn snapshot(&self, now: Duration) -> PanelSnapshot {
        PanelSnapshot {
            tab: self.tab,
            expanded: self.expanded.clone(),
            all_expanded: self.all_expanded,
            privacy_notice: self.privacy_notice,
            copied: self.copied(now),
            history_cleared: self.history_cleared(now),
            pending_link: match &self.pending {
                Some(PendingLeave::Link(url)) => Some(url.clone()),
                _ => None,
            },
            pending_call: match &self.pending {
                Some(PendingLeave::Call(number)) => Some(number.clone()),
                _ => None,
            },
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn defaults_match_first_open() {
        let panel = ResourcePanel::default();
        assert_eq!(panel.tab(), PanelTab::Reassurance);
        let snap = panel.snapshot(Duration::ZERO);
        assert!(snap.privacy_notice);
        assert!(snap.expanded.is_empty());
        assert!(snap.pending_link.is_none());
    }

    #[test]
    fn tab_names_parse() {
        for tab in PanelTab::ALL {
            assert_eq!(tab.name().parse::<PanelTab>(), Ok(tab));
        }
        assert!("weather".parse::<PanelTab>().is_err());
    }

    #[test]
    fn toggle_all_expands_then_collapses() {
        let mut panel = ResourcePanel::default();
        panel.toggle_all();
        assert!(Section::ALL.iter().all(|s| panel.is_expanded(*s)));
        panel.toggle_all();
        assert!(Section::ALL.iter().all(|s| !panel.is_expanded(*s)));
    }

    #[test]
    fn toggling_every_section_counts_as_all_expanded() {
        let mut panel = ResourcePanel::default();
        for section in Section::ALL {
            panel.toggle_section(section);
        }
        assert!(panel.snapshot(Duration::ZERO).all_expanded);
        panel.toggle_section(Section::Phone);
        assert!(!panel.snapshot(Duration::ZERO).all_expanded);
        assert!(!panel.is_expanded(Section::Phone));
    }

    #[test]
    fn copied_ack_expires() {
        let mut panel = ResourcePanel::default();
        panel.mark_copied(ms(1_000), ms(2_000));
        assert!(panel.copied(ms(2_999)));
        assert!(!panel.tick(ms(2_999)));
        assert!(panel.tick(ms(3_000)));
        assert!(!panel.copied(ms(3_000)));
    }

    #[test]
    fn link_warning_flow() {
        let mut panel = ResourcePanel::default();
        assert_eq!(
            panel.resolve_link(LinkChoice::Continue),
            LinkResolution::NothingPending
        );
        panel.request_link("https://www.thehotline.org/");
        assert_eq!(
            panel.resolve_link(LinkChoice::CopyInstead),
            LinkResolution::Copy("https://www.thehotline.org/".to_string())
        );
        assert!(panel.snapshot(Duration::ZERO).pending_link.is_none());
        panel.request_link("https://www.rainn.org/");
        assert_eq!(
            panel.resolve_link(LinkChoice::Cancel),
            LinkResolution::Cancelled
        );
    }

    #[test]
    fn call_warning_dials_digits_or_copies_number() {
        let mut panel = ResourcePanel::default();
        panel.request_call("1-800-799-7233");
        let snap = panel.snapshot(Duration::ZERO);
        assert_eq!(snap.pending_call.as_deref(), Some("1-800-799-7233"));
        assert_eq!(snap.pending_link, None);
        assert_eq!(
            panel.resolve_link(LinkChoice::Continue),
            LinkResolution::Call("tel:18007997233".to_string())
        );

        panel.request_call("1-800-799-7233");
        assert_eq!(
            panel.resolve_link(LinkChoice::CopyInstead),
            LinkResolution::Copy("1-800-799-7233".to_string())
        );
        assert!(panel.snapshot(Duration::ZERO).pending_call.is_none());
    }

    #[test]
    fn newer_request_replaces_pending_one() {
        let mut panel = ResourcePanel::default();
        panel.request_link("https://www.thehotline.org/");
        panel.request_call("(800) 656-4673");
        assert_eq!(panel.snapshot(Duration::ZERO).pending_link, None);
        assert_eq!(
            panel.resolve_link(LinkChoice::Continue),
            LinkResolution::Call("tel:8006564673".to_string())
        );
    }

    #[test]
    fn reset_restores_defaults() {
        let mut panel = ResourcePanel::default();
        panel.select_tab(PanelTab::Secure);
        panel.dismiss_privacy_notice();
        panel.request_call("911");
        panel.reset();
        assert_eq!(panel, ResourcePanel::default());
    }

    #[test]
    fn link_choice_names() {
        assert_eq!("copy_instead".parse(), Ok(LinkChoice::CopyInstead));
        assert!("open".parse::<LinkChoice>().is_err());
    }
}
