//! Process-wide forced-logout signal.
//!
//! The HTTP layer gets a clone of [`ForcedLogoutSignal`] and calls
//! [`ForcedLogoutSignal::raise`] when the backend rejects the credential. It
//! never needs a reference to the session store itself.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn next(counter: &AtomicU64) -> Self {
        Self(counter.fetch_add(1, Ordering::Relaxed))
    }
}

type Handler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct SignalInner {
    handlers: Mutex<Vec<(SubscriptionId, Handler)>>,
    next_id: AtomicU64,
    bridged: AtomicBool,
}

/// Payload-less broadcast signal.
///
/// - No IO / no async
/// - `raise` runs every handler synchronously, once, in subscription order
#[derive(Clone, Default)]
pub struct ForcedLogoutSignal {
    inner: Arc<SignalInner>,
}

impl ForcedLogoutSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriptionId::next(&self.inner.next_id);
        self.handlers().push((id, Arc::new(handler)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers();
        let before = handlers.len();
        handlers.retain(|(sid, _)| *sid != id);
        handlers.len() != before
    }

    /// Notify every subscriber. Returns how many handlers ran.
    pub fn raise(&self) -> usize {
        // Snapshot first so handlers may subscribe/unsubscribe while running.
        let handlers: Vec<Handler> = self.handlers().iter().map(|(_, h)| Arc::clone(h)).collect();

        tracing::debug!(subscribers = handlers.len(), "forced logout raised");
        for handler in &handlers {
            handler();
        }
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers().len()
    }

    /// Registration guard for the session bridge: true for the first caller only.
    pub(crate) fn claim_bridge(&self) -> bool {
        self.inner
            .bridged
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release_bridge(&self) {
        self.inner.bridged.store(false, Ordering::Release);
    }

    pub fn is_bridged(&self) -> bool {
        self.inner.bridged.load(Ordering::Acquire)
    }

    fn handlers(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Handler)>> {
        self.inner.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl core::fmt::Debug for ForcedLogoutSignal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ForcedLogoutSignal")
            .field("subscribers", &self.subscriber_count())
            .field("bridged", &self.is_bridged())
            .finish()
    }
}
