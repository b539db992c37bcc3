//! Wires the forced-logout signal to `SessionStore::clear_auth`.

use std::sync::Arc;

use thiserror::Error;

use crate::signal::{ForcedLogoutSignal, SubscriptionId};
use crate::store::SessionStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("a session bridge is already installed on this logout signal")]
    AlreadyInstalled,
}

/// The one listener that turns a forced-logout signal into `clear_auth()`.
///
/// Install it once at startup, before the network layer can raise the signal.
/// Dropping the handle leaves the listener in place; call
/// [`LogoutSignalBridge::uninstall`] to detach it.
#[derive(Debug)]
pub struct LogoutSignalBridge {
    signal: ForcedLogoutSignal,
    subscription: SubscriptionId,
}

impl LogoutSignalBridge {
    pub fn install(signal: &ForcedLogoutSignal, store: Arc<SessionStore>) -> Result<Self, BridgeError> {
        if !signal.claim_bridge() {
            tracing::warn!("refusing to install a second forced-logout bridge");
            return Err(BridgeError::AlreadyInstalled);
        }

        let subscription = signal.subscribe(move || {
            tracing::info!("forced logout received; clearing session");
            store.clear_auth();
        });

        Ok(Self {
            signal: signal.clone(),
            subscription,
        })
    }

    pub fn signal(&self) -> &ForcedLogoutSignal {
        &self.signal
    }

    pub fn uninstall(self) {
        self.signal.unsubscribe(self.subscription);
        self.signal.release_bridge();
    }
}
