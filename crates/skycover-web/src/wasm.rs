#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use skycover_core::input::Modifiers;
use skycover_core::panel::LinkResolution;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{Document, Element, Event, KeyboardEvent, MouseEvent};
use web_time::{Duration, Instant};

use crate::bridge::{EXTERNAL_WINDOW_FEATURES, EXTERNAL_WINDOW_META, WebBridge, try_update};
use crate::dom_env::{DomEnvironment, diagnostic};

/// iOS Safari skips `beforeunload`; `pagehide` covers it. The scrub is
/// idempotent, so browsers firing both are fine.
const UNLOAD_EVENTS: [&str; 2] = ["beforeunload", "pagehide"];

struct Inner {
    bridge: WebBridge<DomEnvironment>,
    started: Instant,
    on_change: Option<js_sys::Function>,
}

impl Inner {
    fn now(&self) -> Duration {
        self.started.elapsed()
    }
}

type Shared = Rc<RefCell<Inner>>;

/// Run `f` against the shared state, then tell the host to re-render.
///
/// Returns `None` without running `f` when the session is busy further up the
/// stack. The borrow ends before the callback fires, so `onChange` handlers
/// may call straight back into [`SkycoverWeb`].
fn update<R>(shared: &Shared, f: impl FnOnce(&mut Inner) -> R) -> Option<R> {
    let Some((out, callback)) = try_update(shared, |inner| {
        let out = f(inner);
        (out, inner.on_change.clone())
    }) else {
        diagnostic("session busy, call skipped");
        return None;
    };
    if let Some(callback) = callback {
        if let Err(err) = callback.call0(&JsValue::NULL) {
            diagnostic(&format!("onChange threw: {err:?}"));
        }
    }
    Some(out)
}

/// Expire acknowledgments once `delay` has passed.
fn schedule_tick(shared: &Shared, delay: Duration) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let shared = Rc::clone(shared);
    let callback = Closure::once_into_js(move || {
        update(&shared, |inner| {
            let now = inner.now();
            inner.bridge.tick(now)
        });
    });
    let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
    if let Err(err) = window
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), millis)
    {
        diagnostic(&format!("setTimeout failed: {err:?}"));
    }
}

fn copy_to_clipboard(shared: &Shared, text: String) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let promise = window.navigator().clipboard().write_text(&text);
    let shared = Rc::clone(shared);
    spawn_local(async move {
        match JsFuture::from(promise).await {
            Ok(_) => {
                let ack = update(&shared, |inner| {
                    let now = inner.now();
                    inner.bridge.mark_copied(now);
                    inner.bridge.session().config().copy_ack()
                });
                if let Some(ack) = ack {
                    schedule_tick(&shared, ack);
                }
            }
            Err(err) => diagnostic(&format!("clipboard write failed: {err:?}")),
        }
    });
}

fn open_external(url: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    match window.open_with_url_and_target_and_features(url, "_blank", EXTERNAL_WINDOW_FEATURES) {
        Ok(Some(opened)) => {
            // Cross-origin documents throw on access; nothing to do then.
            let head = js_sys::Reflect::get(&opened, &JsValue::from_str("document"))
                .ok()
                .and_then(|doc| doc.dyn_into::<Document>().ok())
                .and_then(|doc| doc.head());
            if let Some(head) = head {
                if let Err(err) = head.insert_adjacent_html("beforeend", EXTERNAL_WINDOW_META) {
                    diagnostic(&format!("meta injection skipped: {err:?}"));
                }
            }
        }
        // noopener windows come back as null; that is the normal case.
        Ok(None) => {}
        Err(err) => diagnostic(&format!("window.open failed: {err:?}")),
    }
}

/// Hand a `tel:` URI to the current window so the OS dialer picks it up.
fn dial(tel_uri: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Err(err) = window.location().set_href(tel_uri) {
        diagnostic(&format!("dial failed: {err:?}"));
    }
}

fn seed() -> u64 {
    let hi = (js_sys::Math::random() * f64::from(u32::MAX)) as u64;
    let lo = (js_sys::Math::random() * f64::from(u32::MAX)) as u64;
    (hi << 32) | lo
}

struct Listeners {
    keydown: Closure<dyn FnMut(KeyboardEvent)>,
    dblclick: Closure<dyn FnMut(MouseEvent)>,
    /// Registered once per entry of [`UNLOAD_EVENTS`].
    unload: Closure<dyn FnMut(Event)>,
}

impl Listeners {
    /// Unregister everything. Closures must not outlive their registration.
    fn remove(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let _ = window
            .remove_event_listener_with_callback("keydown", self.keydown.as_ref().unchecked_ref());
        for name in UNLOAD_EVENTS {
            let _ = window
                .remove_event_listener_with_callback(name, self.unload.as_ref().unchecked_ref());
        }
        if let Some(document) = window.document() {
            let _ = document.remove_event_listener_with_callback(
                "dblclick",
                self.dblclick.as_ref().unchecked_ref(),
            );
        }
    }
}

/// The disguised page controller.
///
/// Construct with optional JSON options, call `mount()` to start listening
/// and render from `snapshot()` whenever `onChange` fires.
#[wasm_bindgen]
pub struct SkycoverWeb {
    shared: Shared,
    listeners: Option<Listeners>,
}

impl SkycoverWeb {
    fn detach(&mut self) {
        if let Some(listeners) = self.listeners.take() {
            listeners.remove();
        }
    }
}

impl Drop for SkycoverWeb {
    fn drop(&mut self) {
        self.detach();
    }
}

#[wasm_bindgen]
impl SkycoverWeb {
    #[wasm_bindgen(constructor)]
    pub fn new(options: Option<String>) -> Result<SkycoverWeb, JsValue> {
        let mut rng = SmallRng::seed_from_u64(seed());
        let bridge = WebBridge::new(options.as_deref(), DomEnvironment, &mut rng)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        Ok(Self {
            shared: Rc::new(RefCell::new(Inner {
                bridge,
                started: Instant::now(),
                on_change: None,
            })),
            listeners: None,
        })
    }

    /// Install the keyboard, double-click and unload listeners. Calling it
    /// twice is a no-op.
    pub fn mount(&mut self) -> Result<(), JsValue> {
        if self.listeners.is_some() {
            return Ok(());
        }
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let shared = Rc::clone(&self.shared);
        let keydown = Closure::<dyn FnMut(KeyboardEvent)>::wrap(Box::new(
            move |event: KeyboardEvent| {
                let mods = Modifiers::from_dom_flags(
                    event.shift_key(),
                    event.alt_key(),
                    event.ctrl_key(),
                    event.meta_key(),
                );
                update(&shared, |inner| {
                    let now = inner.now();
                    inner
                        .bridge
                        .on_key(&event.key(), &event.code(), mods, event.repeat(), now)
                });
            },
        ));

        let shared = Rc::clone(&self.shared);
        let dblclick = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |event: MouseEvent| {
            let class_name = event
                .target()
                .and_then(|target| target.dyn_into::<Element>().ok())
                .and_then(|element| element.get_attribute("class"))
                .unwrap_or_default();
            update(&shared, |inner| {
                let now = inner.now();
                inner.bridge.on_double_click(&class_name, now)
            });
        }));

        let shared = Rc::clone(&self.shared);
        let unload = Closure::<dyn FnMut(Event)>::wrap(Box::new(move |_event: Event| {
            // No re-render: the page is going away. Busy means quick exit is
            // navigating and has already purged.
            try_update(&shared, |inner| {
                let now = inner.now();
                inner.bridge.on_unload(now)
            });
        }));

        // Keep the closures owned before registering, so a failed
        // registration still gets cleaned up.
        self.listeners = Some(Listeners {
            keydown,
            dblclick,
            unload,
        });
        let Some(listeners) = self.listeners.as_ref() else {
            return Ok(());
        };
        let registered = window
            .add_event_listener_with_callback("keydown", listeners.keydown.as_ref().unchecked_ref())
            .and_then(|()| {
                document.add_event_listener_with_callback(
                    "dblclick",
                    listeners.dblclick.as_ref().unchecked_ref(),
                )
            })
            .and_then(|()| {
                UNLOAD_EVENTS.iter().try_for_each(|name| {
                    window.add_event_listener_with_callback(
                        name,
                        listeners.unload.as_ref().unchecked_ref(),
                    )
                })
            });
        if registered.is_err() {
            self.detach();
        }
        registered
    }

    /// Remove every listener and drop the change callback. Dropping the
    /// object (`free()` from JS) removes the listeners as well.
    pub fn destroy(&mut self) {
        self.detach();
        if let Ok(mut inner) = self.shared.try_borrow_mut() {
            inner.on_change = None;
        }
    }

    /// Register the re-render callback.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: Option<js_sys::Function>) {
        if let Ok(mut inner) = self.shared.try_borrow_mut() {
            inner.on_change = callback;
        }
    }

    #[wasm_bindgen(js_name = isRevealed)]
    pub fn is_revealed(&self) -> bool {
        self.shared
            .try_borrow()
            .is_ok_and(|inner| inner.bridge.is_revealed())
    }

    /// Session state as JSON, or `null` while the session is busy.
    pub fn snapshot(&self) -> Option<String> {
        let inner = self.shared.try_borrow().ok()?;
        Some(inner.bridge.snapshot_json(inner.now()))
    }

    /// Close the resources panel and scrub.
    pub fn close(&self) -> bool {
        update(&self.shared, |inner| inner.bridge.close()).unwrap_or(false)
    }

    #[wasm_bindgen(js_name = quickExit)]
    pub fn quick_exit(&self) -> bool {
        update(&self.shared, |inner| inner.bridge.quick_exit()).unwrap_or(false)
    }

    #[wasm_bindgen(js_name = clearHistory)]
    pub fn clear_history(&self) -> bool {
        let Some((ok, ack)) = update(&self.shared, |inner| {
            let now = inner.now();
            let ok = inner.bridge.clear_history(now);
            (ok, inner.bridge.session().config().history_ack())
        }) else {
            return false;
        };
        schedule_tick(&self.shared, ack);
        ok
    }

    #[wasm_bindgen(js_name = dismissWelcome)]
    pub fn dismiss_welcome(&self) {
        update(&self.shared, |inner| inner.bridge.dismiss_welcome());
    }

    #[wasm_bindgen(js_name = selectTab)]
    pub fn select_tab(&self, name: &str) -> Result<(), JsValue> {
        update(&self.shared, |inner| inner.bridge.select_tab(name))
            .unwrap_or(Ok(()))
            .map_err(|err| JsValue::from_str(&err.to_string()))
    }

    #[wasm_bindgen(js_name = toggleSection)]
    pub fn toggle_section(&self, name: &str) -> Result<(), JsValue> {
        update(&self.shared, |inner| inner.bridge.toggle_section(name))
            .unwrap_or(Ok(()))
            .map_err(|err| JsValue::from_str(&err.to_string()))
    }

    #[wasm_bindgen(js_name = toggleAllSections)]
    pub fn toggle_all_sections(&self) {
        update(&self.shared, |inner| inner.bridge.toggle_all_sections());
    }

    #[wasm_bindgen(js_name = dismissPrivacy)]
    pub fn dismiss_privacy(&self) {
        update(&self.shared, |inner| inner.bridge.dismiss_privacy());
    }

    /// Copy `text` to the clipboard; the acknowledgment only appears once the
    /// write succeeds.
    #[wasm_bindgen(js_name = copyText)]
    pub fn copy_text(&self, text: String) {
        copy_to_clipboard(&self.shared, text);
    }

    /// Show the warning before following an external resource link.
    #[wasm_bindgen(js_name = requestLink)]
    pub fn request_link(&self, url: &str) {
        update(&self.shared, |inner| inner.bridge.request_link(url));
    }

    /// Show the call-history warning before dialing `number`.
    #[wasm_bindgen(js_name = requestCall)]
    pub fn request_call(&self, number: &str) {
        update(&self.shared, |inner| inner.bridge.request_call(number));
    }

    /// Answer the pending warning with `continue`, `copy_instead` or `cancel`.
    #[wasm_bindgen(js_name = resolveLink)]
    pub fn resolve_link(&self, choice: &str) -> Result<(), JsValue> {
        let Some(resolution) = update(&self.shared, |inner| inner.bridge.resolve_link(choice))
        else {
            return Ok(());
        };
        match resolution.map_err(|err| JsValue::from_str(&err.to_string()))? {
            LinkResolution::Open(url) => open_external(&url),
            LinkResolution::Call(tel_uri) => dial(&tel_uri),
            LinkResolution::Copy(text) => copy_to_clipboard(&self.shared, text),
            LinkResolution::Cancelled | LinkResolution::NothingPending => {}
        }
        Ok(())
    }
}
