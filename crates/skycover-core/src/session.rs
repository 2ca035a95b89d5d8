#![forbid(unsafe_code)]

//! Application store: the explicit state object behind the page.
//!
//! [`DisguiseSession`] owns every piece of mutable state (disguise state, key
//! window, exit target, panel state) together with the host
//! [`Environment`]. Hosts feed it input events and panel actions; it applies
//! the transition table below and performs the side effects.
//!
//! | State     | Event                      | Next      | Side effect                   |
//! |-----------|----------------------------|-----------|-------------------------------|
//! | Weather   | secret code typed          | Resources | revealed title                |
//! | Weather   | double-click trigger word  | Resources | revealed title                |
//! | Resources | Escape                     | Weather   | cover title, scrub            |
//! | Resources | explicit close             | Weather   | cover title, scrub            |
//! | any       | quick exit                 | exited    | purge, pad history, navigate  |
//! | any       | unload                     | unchanged | scrub                         |
//!
//! Once exited, the session ignores everything.

use core::time::Duration;

use rand::Rng;
use serde::Serialize;

use crate::config::{ConfigError, DisguiseConfig};
use crate::disguise::{DisguiseState, Transition};
use crate::effects::Environment;
use crate::exit::{ExitReport, QuickExit, QuickExitTarget};
use crate::input::InputEvent;
use crate::key_sequence::SecretCode;
use crate::panel::{LinkChoice, LinkResolution, PanelSnapshot, ResourcePanel};
use crate::scrubber::{HistoryScrubber, PurgeReport};
use crate::trigger::{TriggerDetector, TriggerMarker, TriggerSignal};

/// Serializable view of the session for the host renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: DisguiseState,
    pub title: String,
    pub exited: bool,
    pub welcome: bool,
    pub exit_target: QuickExitTarget,
    /// Present only while the resources panel is shown.
    pub panel: Option<PanelSnapshot>,
}

pub struct DisguiseSession<E: Environment> {
    config: DisguiseConfig,
    env: E,
    state: DisguiseState,
    exited: bool,
    detector: TriggerDetector,
    scrubber: HistoryScrubber,
    exit: QuickExit,
    exit_target: QuickExitTarget,
    panel: ResourcePanel,
    welcome: bool,
}

impl<E: Environment> core::fmt::Debug for DisguiseSession<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DisguiseSession")
            .field("state", &self.state)
            .field("exited", &self.exited)
            .field("detector", &self.detector)
            .finish_non_exhaustive()
    }
}

impl<E: Environment> DisguiseSession<E> {
    /// Validate `config`, pick the quick-exit target and show the cover.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub fn new<R: Rng + ?Sized>(
        config: DisguiseConfig,
        mut env: E,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let exit_target =
            QuickExitTarget::choose(&config.exit_targets, rng).ok_or(ConfigError::Invalid {
                field: "exit_targets",
                reason: "must not be empty",
            })?;

        let state = DisguiseState::Weather;
        if let Err(err) = env.set_title(state.title(&config.titles)) {
            crate::debug!(error = %err, "initial title rejected");
        }

        Ok(Self {
            detector: TriggerDetector::new(
                SecretCode::new(&config.secret_code),
                TriggerMarker::new(config.trigger_marker.clone()),
            ),
            scrubber: HistoryScrubber::new(config.base_path.clone()),
            exit: QuickExit::new(config.base_path.clone(), config.history_padding),
            exit_target,
            config,
            env,
            state,
            exited: false,
            panel: ResourcePanel::default(),
            welcome: true,
        })
    }

    /// Dispatch one host input event.
    pub fn handle(&mut self, event: &InputEvent, now: Duration) -> Transition {
        if self.exited {
            return Transition::None;
        }
        let transition = match event {
            InputEvent::Key(key) => match self.detector.on_key(key) {
                TriggerSignal::Reveal => self.reveal_transition(),
                TriggerSignal::Dismiss if self.is_revealed() => {
                    self.hide();
                    Transition::Hidden
                }
                TriggerSignal::Dismiss | TriggerSignal::None => Transition::None,
            },
            InputEvent::DoubleClick(click) => {
                match self.detector.on_double_click(&click.class_name) {
                    TriggerSignal::Reveal => self.reveal_transition(),
                    TriggerSignal::Dismiss | TriggerSignal::None => Transition::None,
                }
            }
            InputEvent::Unload => {
                self.unload();
                Transition::Unloaded
            }
        };
        self.panel.tick(now);
        transition
    }

    fn reveal_transition(&mut self) -> Transition {
        if self.reveal() {
            Transition::Revealed
        } else {
            Transition::None
        }
    }

    /// Show the resources panel. Returns `false` when nothing changed.
    ///
    /// Only the document title is touched; nothing is written to storage.
    pub fn reveal(&mut self) -> bool {
        if self.exited || self.state.is_revealed() {
            return false;
        }
        self.state = DisguiseState::Resources;
        self.apply_title();
        crate::info!("resources revealed");
        true
    }

    /// Return to the weather cover and scrub. Idempotent: a second call does
    /// nothing and returns `None`.
    pub fn hide(&mut self) -> Option<PurgeReport> {
        if self.exited || !self.state.is_revealed() {
            return None;
        }
        self.state = DisguiseState::Weather;
        self.panel.reset();
        self.apply_title();
        let report = self.scrubber.scrub(&mut self.env);
        crate::info!("resources hidden");
        Some(report)
    }

    /// The panel's close button.
    pub fn close(&mut self) -> Option<PurgeReport> {
        self.hide()
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.state.is_revealed()
    }

    /// Purge and leave for the session's exit target. Allowed from any state;
    /// returns `None` if the session already exited.
    pub fn quick_exit(&mut self) -> Option<ExitReport> {
        if self.exited {
            return None;
        }
        self.exited = true;
        Some(self.exit.run(&mut self.env, &self.exit_target))
    }

    /// The panel's "Clear History" action.
    pub fn clear_history(&mut self, now: Duration) -> Option<PurgeReport> {
        if self.exited {
            return None;
        }
        let report = self.scrubber.scrub(&mut self.env);
        self.panel.mark_history_cleared(now, self.config.history_ack());
        Some(report)
    }

    /// Best-effort scrub while the page unloads.
    pub fn unload(&mut self) -> Option<PurgeReport> {
        if self.exited {
            return None;
        }
        Some(self.scrubber.scrub(&mut self.env))
    }

    pub fn dismiss_welcome(&mut self) {
        self.welcome = false;
    }

    /// A clipboard write finished successfully.
    pub fn mark_copied(&mut self, now: Duration) {
        self.panel.mark_copied(now, self.config.copy_ack());
    }

    /// Answer the external-link or call warning. Nothing can be resolved
    /// while the panel is hidden or after quick exit.
    pub fn resolve_link(&mut self, choice: LinkChoice) -> LinkResolution {
        if self.exited || !self.state.is_revealed() {
            return LinkResolution::NothingPending;
        }
        self.panel.resolve_link(choice)
    }

    /// Expire acknowledgments. Returns whether the view changed.
    pub fn tick(&mut self, now: Duration) -> bool {
        self.panel.tick(now)
    }

    #[must_use]
    pub fn snapshot(&self, now: Duration) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            title: self.state.title(&self.config.titles).to_string(),
            exited: self.exited,
            welcome: self.welcome,
            exit_target: self.exit_target.clone(),
            panel: self
                .state
                .is_revealed()
                .then(|| self.panel.snapshot(now)),
        }
    }

    #[must_use]
    pub const fn state(&self) -> DisguiseState {
        self.state
    }

    #[must_use]
    pub const fn is_exited(&self) -> bool {
        self.exited
    }

    #[must_use]
    pub fn exit_target(&self) -> &QuickExitTarget {
        &self.exit_target
    }

    #[must_use]
    pub fn config(&self) -> &DisguiseConfig {
        &self.config
    }

    #[must_use]
    pub fn detector(&self) -> &TriggerDetector {
        &self.detector
    }

    #[must_use]
    pub fn panel(&self) -> &ResourcePanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut ResourcePanel {
        &mut self.panel
    }

    #[must_use]
    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn into_env(self) -> E {
        self.env
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn apply_title(&mut self) {
        if let Err(err) = self.env.set_title(self.state.title(&self.config.titles)) {
            crate::debug!(error = %err, "title update rejected");
        }
    }
}
