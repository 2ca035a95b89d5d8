#![forbid(unsafe_code)]

//! Host-agnostic glue between the JS API and [`DisguiseSession`].
//!
//! Every exported method of the wasm binding is a thin wrapper over
//! [`WebBridge`]; names arriving from JS are parsed here so the same paths run
//! under native tests with a [`RecordingEnvironment`](skycover_core::RecordingEnvironment).

use core::cell::RefCell;
use core::time::Duration;

use rand::Rng;
use skycover_core::input::{
    DoubleClickInput, InputEvent, KeyInput, KeyPhase, Modifiers, normalize_dom_key_code,
};
use skycover_core::panel::{LinkChoice, LinkResolution, PanelTab, ResourcePanel, Section, UnknownName};
use skycover_core::{ConfigError, DisguiseConfig, DisguiseSession, Environment, Transition};

/// Window features for links leaving the site.
pub const EXTERNAL_WINDOW_FEATURES: &str = "noopener,noreferrer";

/// Meta tags injected into a freshly opened resource window, when the browser
/// lets us reach its document.
pub const EXTERNAL_WINDOW_META: &str = concat!(
    r#"<meta name="robots" content="noindex,nofollow">"#,
    r#"<meta name="referrer" content="no-referrer">"#,
);

/// Parse the constructor options. `None`, empty and whitespace-only input
/// yield the default configuration.
pub fn parse_options(options: Option<&str>) -> Result<DisguiseConfig, ConfigError> {
    match options.map(str::trim) {
        None | Some("") => Ok(DisguiseConfig::default()),
        Some(json) => DisguiseConfig::from_json_str(json),
    }
}

/// Translate a DOM `keydown` into an input event.
#[must_use]
pub fn key_down_event(key: &str, code: &str, mods: Modifiers, repeat: bool) -> InputEvent {
    InputEvent::Key(KeyInput {
        phase: KeyPhase::Down,
        code: normalize_dom_key_code(key, code),
        mods,
        repeat,
    })
}

#[must_use]
pub fn double_click_event(class_name: &str) -> InputEvent {
    InputEvent::DoubleClick(DoubleClickInput {
        class_name: class_name.into(),
    })
}

/// Run `f` on shared state unless it is already borrowed further up the stack.
///
/// Browsers dispatch `beforeunload`/`pagehide` synchronously from inside a
/// navigation the session itself started. Quick exit has purged by then, so
/// the nested call is skipped and `None` returned.
pub fn try_update<T, R>(shared: &RefCell<T>, f: impl FnOnce(&mut T) -> R) -> Option<R> {
    let mut inner = shared.try_borrow_mut().ok()?;
    Some(f(&mut inner))
}

/// Session plus the string-keyed command surface exposed to JS.
#[derive(Debug)]
pub struct WebBridge<E: Environment> {
    session: DisguiseSession<E>,
}

impl<E: Environment> WebBridge<E> {
    pub fn new<R: Rng + ?Sized>(
        options: Option<&str>,
        env: E,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let config = parse_options(options)?;
        Ok(Self {
            session: DisguiseSession::new(config, env, rng)?,
        })
    }

    pub fn on_key(
        &mut self,
        key: &str,
        code: &str,
        mods: Modifiers,
        repeat: bool,
        now: Duration,
    ) -> Transition {
        self.session
            .handle(&key_down_event(key, code, mods, repeat), now)
    }

    pub fn on_double_click(&mut self, class_name: &str, now: Duration) -> Transition {
        self.session.handle(&double_click_event(class_name), now)
    }

    pub fn on_unload(&mut self, now: Duration) -> Transition {
        self.session.handle(&InputEvent::Unload, now)
    }

    /// Returns whether the panel was open.
    pub fn close(&mut self) -> bool {
        self.session.close().is_some()
    }

    /// Returns `false` once the session has already left.
    pub fn quick_exit(&mut self) -> bool {
        self.session.quick_exit().is_some()
    }

    /// Returns whether every purge step succeeded.
    pub fn clear_history(&mut self, now: Duration) -> bool {
        self.session
            .clear_history(now)
            .is_some_and(|report| report.all_succeeded())
    }

    pub fn dismiss_welcome(&mut self) {
        self.session.dismiss_welcome();
    }

    pub fn select_tab(&mut self, name: &str) -> Result<(), UnknownName> {
        let tab: PanelTab = name.parse()?;
        if let Some(panel) = self.open_panel() {
            panel.select_tab(tab);
        }
        Ok(())
    }

    pub fn toggle_section(&mut self, name: &str) -> Result<(), UnknownName> {
        let section: Section = name.parse()?;
        if let Some(panel) = self.open_panel() {
            panel.toggle_section(section);
        }
        Ok(())
    }

    pub fn toggle_all_sections(&mut self) {
        if let Some(panel) = self.open_panel() {
            panel.toggle_all();
        }
    }

    pub fn dismiss_privacy(&mut self) {
        if let Some(panel) = self.open_panel() {
            panel.dismiss_privacy_notice();
        }
    }

    pub fn request_link(&mut self, url: &str) {
        if let Some(panel) = self.open_panel() {
            panel.request_link(url);
        }
    }

    /// Ask before dialing `number`.
    pub fn request_call(&mut self, number: &str) {
        if let Some(panel) = self.open_panel() {
            panel.request_call(number);
        }
    }

    pub fn resolve_link(&mut self, choice: &str) -> Result<LinkResolution, UnknownName> {
        let choice: LinkChoice = choice.parse()?;
        if self.open_panel().is_none() {
            return Ok(LinkResolution::NothingPending);
        }
        Ok(self.session.resolve_link(choice))
    }

    /// The clipboard accepted a write.
    pub fn mark_copied(&mut self, now: Duration) {
        if !self.session.is_exited() {
            self.session.mark_copied(now);
        }
    }

    pub fn tick(&mut self, now: Duration) -> bool {
        self.session.tick(now)
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.session.is_revealed()
    }

    /// JSON view of the session for the host renderer.
    #[must_use]
    pub fn snapshot_json(&self, now: Duration) -> String {
        serde_json::to_string(&self.session.snapshot(now)).unwrap_or_else(|_| "{}".to_string())
    }

    #[must_use]
    pub fn session(&self) -> &DisguiseSession<E> {
        &self.session
    }

    // Panel edits only land while the panel is on screen.
    fn open_panel(&mut self) -> Option<&mut ResourcePanel> {
        if self.session.is_revealed() && !self.session.is_exited() {
            Some(self.session.panel_mut())
        } else {
            None
        }
    }
}
