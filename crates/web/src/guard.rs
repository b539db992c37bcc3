//! `<RouteGuard>` component.

use fiskal_auth::{GuardDecision, Role};
use leptos::*;
use leptos_router::{NavigateOptions, use_navigate};

use crate::context::use_session;

/// Render `children` only for identities holding one of `allowed_roles`.
///
/// Without a session the user is sent to the login path, with the wrong
/// role to the landing path; both redirects replace the history entry.
#[component]
pub fn RouteGuard(#[prop(into)] allowed_roles: Vec<Role>, children: ChildrenFn) -> impl IntoView {
    let session = use_session();
    let guard = session.store().route_guard(allowed_roles);

    let decision = create_memo(move |_| {
        session.track();
        session.store().evaluate(&guard)
    });

    let navigate = use_navigate();
    create_effect(move |_| {
        if let GuardDecision::Redirect { to, replace } = decision.get() {
            ::tracing::debug!(%to, "route guard redirect");
            navigate(
                &to,
                NavigateOptions {
                    replace,
                    ..Default::default()
                },
            );
        }
    });

    move || decision.get().is_render().then(|| children())
}
