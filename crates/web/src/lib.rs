//! `fiskal-web` — Leptos bindings for the session layer.
//!
//! Browser-only: everything here compiles for `wasm32` and is empty on
//! native targets, where hosts use `fiskal-session` directly.

#[cfg(target_arch = "wasm32")]
pub mod context;
#[cfg(target_arch = "wasm32")]
pub mod guard;
#[cfg(target_arch = "wasm32")]
pub mod logout;
#[cfg(target_arch = "wasm32")]
pub mod storage;

#[cfg(target_arch = "wasm32")]
pub use context::{
    SessionContext, provide_session, use_has_any_role, use_has_permission, use_identity,
    use_is_admin, use_roles, use_session,
};
#[cfg(target_arch = "wasm32")]
pub use guard::RouteGuard;
#[cfg(target_arch = "wasm32")]
pub use logout::{FORCED_LOGOUT_EVENT, install_forced_logout_listener};
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorageStore;

/// Start the browser session: hydrate from `localStorage` and route the
/// `auth:logout` DOM event into the logout signal.
///
/// Call before mounting the app, then `provide_session(runtime.store)` in the
/// root component.
#[cfg(target_arch = "wasm32")]
pub fn boot(config: fiskal_session::SessionConfig) -> fiskal_session::SessionRuntime {
    use std::sync::Arc;

    console_error_panic_hook::set_once();

    let runtime = fiskal_session::SessionRuntime::start(Arc::new(LocalStorageStore), config);
    if let Err(err) = install_forced_logout_listener(runtime.logout_signal.clone()) {
        tracing::warn!(error = ?err, "could not listen for forced logout events");
    }
    runtime
}
