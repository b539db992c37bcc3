//! Startup wiring: hydrate the store, then bridge the logout signal.

use std::sync::Arc;

use crate::bridge::LogoutSignalBridge;
use crate::config::SessionConfig;
use crate::signal::ForcedLogoutSignal;
use crate::storage::KeyValueStore;
use crate::store::SessionStore;

/// Everything the rest of the client needs from the session layer.
///
/// Hand `store` to views and guards, and `logout_signal` to the HTTP client
/// so it can end the session on an authentication failure.
#[derive(Debug, Clone)]
pub struct SessionRuntime {
    pub store: Arc<SessionStore>,
    pub logout_signal: ForcedLogoutSignal,
}

impl SessionRuntime {
    /// Hydrate from `storage` and install the logout bridge on a fresh signal.
    ///
    /// The bridge is in place before the signal handle is returned, so nothing
    /// can raise it unobserved.
    pub fn start(storage: Arc<dyn KeyValueStore>, config: SessionConfig) -> Self {
        let store = Arc::new(SessionStore::hydrate(storage, config));
        let logout_signal = ForcedLogoutSignal::new();

        // A fresh signal has no bridge yet, so installation cannot be refused.
        if let Err(err) = LogoutSignalBridge::install(&logout_signal, Arc::clone(&store)) {
            tracing::error!(error = %err, "forced-logout bridge not installed");
        }

        tracing::debug!(authenticated = store.is_authenticated(), "session runtime started");
        Self {
            store,
            logout_signal,
        }
    }
}
