#![forbid(unsafe_code)]

//! Core: disguise state machine, reveal gestures, purge and quick exit.
//!
//! Nothing in this crate touches the DOM. Side effects go through
//! [`effects::Environment`]; time is supplied by the host as a monotonic
//! [`Duration`](core::time::Duration) since page load.

pub mod config;
pub mod disguise;
pub mod effects;
pub mod exit;
pub mod input;
pub mod key_sequence;
pub mod logging;
pub mod panel;
pub mod scrubber;
pub mod session;
pub mod trigger;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, info, trace, warn};

pub use config::{ConfigError, DisguiseConfig};
pub use disguise::{DisguiseState, Transition};
pub use effects::{EffectError, Environment, RecordingEnvironment, StorageArea};
pub use session::{DisguiseSession, SessionSnapshot};
