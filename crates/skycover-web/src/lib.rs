#![forbid(unsafe_code)]

//! WASM frontend for Skycover.
//!
//! Hosts the disguise session in the browser:
//! - DOM side effects (title, history, storage, cookies, navigation),
//! - keyboard, double-click and unload capture,
//! - a `wasm-bindgen` API the page's renderer drives (`snapshot`/`onChange`).

pub mod bridge;

#[cfg(target_arch = "wasm32")]
mod dom_env;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use dom_env::DomEnvironment;
#[cfg(target_arch = "wasm32")]
pub use wasm::SkycoverWeb;

/// Native builds compile this crate against the recording environment so
/// `cargo test --workspace` exercises the command surface off-wasm.
#[cfg(not(target_arch = "wasm32"))]
pub type SkycoverWeb = bridge::WebBridge<skycover_core::RecordingEnvironment>;
