#![forbid(unsafe_code)]

//! [`Environment`] over the browser DOM.

use skycover_core::{EffectError, Environment, StorageArea};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlDocument, Storage, Window};

/// Stateless: every call looks the window up again, so a torn-down page
/// surfaces as [`EffectError::Unavailable`] rather than a stale handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct DomEnvironment;

fn window() -> Result<Window, EffectError> {
    web_sys::window().ok_or(EffectError::Unavailable("window"))
}

fn document() -> Result<Document, EffectError> {
    window()?
        .document()
        .ok_or(EffectError::Unavailable("document"))
}

fn html_document() -> Result<HtmlDocument, EffectError> {
    document()?
        .dyn_into::<HtmlDocument>()
        .map_err(|_| EffectError::Unavailable("cookies"))
}

fn storage(area: StorageArea) -> Result<Storage, EffectError> {
    let window = window()?;
    let storage = match area {
        StorageArea::Local => window.local_storage(),
        StorageArea::Session => window.session_storage(),
    }
    .map_err(js_error)?;
    storage.ok_or(EffectError::Unavailable(area.name()))
}

/// Map a thrown JS value. `SecurityError` is what browsers raise when storage
/// or cookies are blocked by privacy settings.
fn js_error(value: JsValue) -> EffectError {
    let err = match value.dyn_ref::<js_sys::Error>() {
        Some(js) if String::from(js.name()) == "SecurityError" => {
            EffectError::Denied(String::from(js.message()))
        }
        Some(js) => EffectError::Host(String::from(js.message())),
        None => EffectError::Host(value.as_string().unwrap_or_else(|| format!("{value:?}"))),
    };
    diagnostic(&err.to_string());
    err
}

/// Console output for development builds only.
pub(crate) fn diagnostic(message: &str) {
    #[cfg(debug_assertions)]
    web_sys::console::warn_1(&JsValue::from_str(message));
    #[cfg(not(debug_assertions))]
    let _ = message;
}

impl Environment for DomEnvironment {
    fn set_title(&mut self, title: &str) -> Result<(), EffectError> {
        document()?.set_title(title);
        Ok(())
    }

    fn push_history(&mut self, path: &str) -> Result<(), EffectError> {
        window()?
            .history()
            .map_err(js_error)?
            .push_state_with_url(&JsValue::NULL, "", Some(path))
            .map_err(js_error)
    }

    fn replace_history(&mut self, path: &str) -> Result<(), EffectError> {
        window()?
            .history()
            .map_err(js_error)?
            .replace_state_with_url(&JsValue::NULL, "", Some(path))
            .map_err(js_error)
    }

    fn clear_storage(&mut self, area: StorageArea) -> Result<(), EffectError> {
        storage(area)?.clear().map_err(js_error)
    }

    fn storage_keys(&mut self, area: StorageArea) -> Result<Vec<String>, EffectError> {
        let storage = storage(area)?;
        let len = storage.length().map_err(js_error)?;
        let mut keys = Vec::with_capacity(len as usize);
        for index in 0..len {
            if let Some(key) = storage.key(index).map_err(js_error)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn remove_storage_item(&mut self, area: StorageArea, key: &str) -> Result<(), EffectError> {
        storage(area)?.remove_item(key).map_err(js_error)
    }

    fn read_cookies(&mut self) -> Result<String, EffectError> {
        html_document()?.cookie().map_err(js_error)
    }

    fn write_cookie(&mut self, cookie: &str) -> Result<(), EffectError> {
        html_document()?.set_cookie(cookie).map_err(js_error)
    }

    fn navigate_replace(&mut self, url: &str) -> Result<(), EffectError> {
        window()?.location().replace(url).map_err(js_error)
    }

    fn navigate_assign(&mut self, url: &str) -> Result<(), EffectError> {
        window()?.location().assign(url).map_err(js_error)
    }
}
