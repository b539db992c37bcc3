//! DOM side of the forced-logout signal.
//!
//! The HTTP interceptor dispatches `new CustomEvent("auth:logout")` on
//! `window` when a request comes back 401; this listener forwards it to the
//! session's `ForcedLogoutSignal`.

use std::sync::atomic::{AtomicBool, Ordering};

use fiskal_session::ForcedLogoutSignal;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

pub const FORCED_LOGOUT_EVENT: &str = "auth:logout";

static LISTENING: AtomicBool = AtomicBool::new(false);

/// Register the `window` listener. Returns `Ok(false)` if one is already
/// registered for this page.
pub fn install_forced_logout_listener(signal: ForcedLogoutSignal) -> Result<bool, JsValue> {
    if LISTENING.swap(true, Ordering::AcqRel) {
        return Ok(false);
    }

    let window = match web_sys::window() {
        Some(window) => window,
        None => {
            LISTENING.store(false, Ordering::Release);
            return Err(JsValue::from_str("no window object"));
        }
    };

    let on_logout = Closure::<dyn Fn(web_sys::Event)>::new(move |_event: web_sys::Event| {
        signal.raise();
    });

    if let Err(err) =
        window.add_event_listener_with_callback(FORCED_LOGOUT_EVENT, on_logout.as_ref().unchecked_ref())
    {
        LISTENING.store(false, Ordering::Release);
        return Err(err);
    }

    // The listener lives as long as the page.
    on_logout.forget();
    Ok(true)
}
