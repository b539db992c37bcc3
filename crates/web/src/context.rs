//! Session context and the derived-state hooks built on it.
//!
//! Every hook recomputes from the store's current snapshot; the only state
//! kept here is a version counter that the store bumps on each mutation so
//! Leptos knows when to re-run dependents.

use std::sync::Arc;

use fiskal_auth::{Action, Identity, Role, RoleResolution};
use fiskal_session::SessionStore;
use leptos::*;

#[derive(Clone)]
pub struct SessionContext {
    store: Arc<SessionStore>,
    version: RwSignal<u64>,
}

impl SessionContext {
    /// Subscribe to `store` for the lifetime of the current reactive owner.
    ///
    /// The subscription is dropped in `on_cleanup`, so a disposed context no
    /// longer receives updates for a signal that is gone.
    pub fn new(store: Arc<SessionStore>) -> Self {
        let version = create_rw_signal(0u64);
        let subscription = store.subscribe(move |_| {
            version.try_update(|v| *v += 1);
        });

        let owner = Arc::clone(&store);
        on_cleanup(move || {
            owner.unsubscribe(subscription);
        });

        Self { store, version }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Register the calling reactive scope as dependent on the session.
    pub fn track(&self) {
        let _ = self.version.get();
    }
}

/// Put the store into context. Call once, in the root component.
pub fn provide_session(store: Arc<SessionStore>) -> SessionContext {
    let ctx = SessionContext::new(store);
    provide_context(ctx.clone());
    ctx
}

pub fn use_session() -> SessionContext {
    expect_context::<SessionContext>()
}

pub fn use_identity() -> Signal<Option<Identity>> {
    let ctx = use_session();
    Signal::derive(move || {
        ctx.track();
        ctx.store().identity()
    })
}

pub fn use_roles() -> Memo<RoleResolution> {
    let ctx = use_session();
    create_memo(move |_| {
        ctx.track();
        ctx.store().roles()
    })
}

pub fn use_has_permission(action: Action) -> Signal<bool> {
    let roles = use_roles();
    Signal::derive(move || roles.get().has_permission(action))
}

pub fn use_has_any_role(roles: Vec<Role>) -> Signal<bool> {
    let ctx = use_session();
    Signal::derive(move || {
        ctx.track();
        ctx.store().has_any_role(&roles)
    })
}

pub fn use_is_admin() -> Signal<bool> {
    let ctx = use_session();
    Signal::derive(move || {
        ctx.track();
        ctx.store().is_administrator()
    })
}
