//! Session store: the single authoritative holder of the current session.
//!
//! Mutations swap the whole state under the write lock and write it through
//! to the [`KeyValueStore`] before the lock is released, so a reader sees
//! either the old session or the new one, never a mix. Subscribers are
//! notified afterwards, outside any lock.
//!
//! Nothing here returns an error to the caller. Storage failures are logged
//! and the in-memory state stays authoritative; a write that fails halfway
//! wipes the persisted copy, and hydration problems degrade to "logged out".

use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use fiskal_auth::{
    Action, Credential, GuardDecision, Identity, Role, RoleResolution, RouteGuard, resolve_roles,
};
use fiskal_core::OrganizationId;

use crate::config::SessionConfig;
use crate::signal::SubscriptionId;
use crate::storage::{KeyValueStore, StorageError};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveSession {
    credential: Credential,
    identity: Identity,
}

/// Snapshot of {credential, identity, authenticated}.
///
/// Credential and identity live in one `Option`, so one cannot be present
/// without the other and `is_authenticated` is always consistent with them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    active: Option<ActiveSession>,
}

impl SessionState {
    pub fn authenticated(credential: Credential, identity: Identity) -> Self {
        Self {
            active: Some(ActiveSession {
                credential,
                identity,
            }),
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.active.as_ref().map(|s| &s.credential)
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.active.as_ref().map(|s| &s.identity)
    }

    pub fn is_authenticated(&self) -> bool {
        self.active.is_some()
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.identity().is_some_and(|i| i.has_role(role))
    }

    pub fn roles(&self) -> RoleResolution {
        resolve_roles(self.identity())
    }
}

type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    config: SessionConfig,
    state: RwLock<SessionState>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_listener: AtomicU64,
}

impl SessionStore {
    /// Build a store from whatever was persisted by a previous run.
    ///
    /// Both keys present and a parseable identity → authenticated. Anything
    /// else starts logged out; a partial or corrupt record is also wiped so
    /// the next start does not trip over it again.
    pub fn hydrate(storage: Arc<dyn KeyValueStore>, config: SessionConfig) -> Self {
        let state = load_persisted(storage.as_ref(), &config);
        Self::with_state(storage, config, state)
    }

    /// A logged-out store that ignores anything already persisted.
    pub fn empty(storage: Arc<dyn KeyValueStore>, config: SessionConfig) -> Self {
        Self::with_state(storage, config, SessionState::default())
    }

    fn with_state(storage: Arc<dyn KeyValueStore>, config: SessionConfig, state: SessionState) -> Self {
        Self {
            storage,
            config,
            state: RwLock::new(state),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Replace the session with a freshly logged-in one.
    ///
    /// Inputs are stored as given; an empty token or a role-less identity is
    /// the login flow's problem, not ours.
    pub fn set_auth(&self, credential: impl Into<Credential>, identity: Identity) {
        let credential = credential.into();
        let user_id = identity.id;

        let snapshot = {
            let mut state = self.write_state();
            *state = SessionState::authenticated(credential, identity);
            self.persist(&state);
            state.clone()
        };

        tracing::info!(%user_id, "session established");
        self.notify(&snapshot);
    }

    /// Drop the session and its persisted copy. Idempotent.
    pub fn clear_auth(&self) {
        let (snapshot, previous) = {
            let mut state = self.write_state();
            let previous = std::mem::take(&mut *state);
            self.forget_persisted();
            (state.clone(), previous)
        };

        match previous.identity() {
            Some(identity) => tracing::info!(user_id = %identity.id, "session cleared"),
            None => tracing::debug!("clear requested without an active session"),
        }
        self.notify(&snapshot);
    }

    /// Point the current identity at another organization.
    ///
    /// Returns `false` (and changes nothing) when logged out.
    pub fn switch_organization(&self, organization_id: OrganizationId) -> bool {
        let snapshot = {
            let mut state = self.write_state();
            let Some(active) = state.active.as_mut() else {
                return false;
            };
            active.identity.current_organization_id = Some(organization_id);
            self.persist(&state);
            state.clone()
        };

        tracing::info!(%organization_id, "switched organization");
        self.notify(&snapshot);
        true
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionState {
        self.read_state().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.read_state().identity().cloned()
    }

    pub fn credential(&self) -> Option<Credential> {
        self.read_state().credential().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_state().is_authenticated()
    }

    /// Exact membership test on the normalized role name.
    pub fn has_role(&self, role: impl Into<Role>) -> bool {
        self.read_state().has_role(&role.into())
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        fiskal_auth::has_any_role(self.read_state().identity(), roles)
    }

    pub fn is_administrator(&self) -> bool {
        fiskal_auth::is_administrator(self.read_state().identity())
    }

    pub fn roles(&self) -> RoleResolution {
        self.read_state().roles()
    }

    pub fn has_permission(&self, action: Action) -> bool {
        self.roles().has_permission(action)
    }

    /// A guard for `allowed_roles` using the configured redirect paths.
    pub fn route_guard<I, R>(&self, allowed_roles: I) -> RouteGuard
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        RouteGuard::new(allowed_roles)
            .with_login_path(self.config.login_path.clone())
            .with_landing_path(self.config.landing_path.clone())
    }

    pub fn evaluate(&self, guard: &RouteGuard) -> GuardDecision {
        guard.evaluate(self.read_state().identity())
    }

    // ── Subscriptions ───────────────────────────────────────────────

    /// Call `listener` with the new state after every mutation.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let id = SubscriptionId::next(&self.next_listener);
        self.lock_listeners().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    fn notify(&self, snapshot: &SessionState) {
        let listeners: Vec<Listener> = self
            .lock_listeners()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            listener(snapshot);
        }
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Write the session through to storage.
    ///
    /// A partial write is never left behind: if either key cannot be written,
    /// both are removed so the next hydration starts logged out instead of
    /// pairing the new credential with a stale identity.
    fn persist(&self, state: &SessionState) {
        let Some(active) = state.active.as_ref() else {
            self.forget_persisted();
            return;
        };

        if let Err(err) = self.write_through(active) {
            tracing::warn!(error = %err, "failed to persist session; discarding the stored copy");
            self.forget_persisted();
        }
    }

    fn write_through(&self, active: &ActiveSession) -> Result<(), StorageError> {
        let record = serde_json::to_string(&active.identity)?;
        self.storage.set(&self.config.token_key, active.credential.as_str())?;
        self.storage.set(&self.config.identity_key, &record)?;
        Ok(())
    }

    fn forget_persisted(&self) {
        forget(self.storage.as_ref(), &self.config);
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStore")
            .field("config", &self.config)
            .field("state", &*self.read_state())
            .finish_non_exhaustive()
    }
}

fn load_persisted(storage: &dyn KeyValueStore, config: &SessionConfig) -> SessionState {
    let token = read_key(storage, &config.token_key);
    let record = read_key(storage, &config.identity_key);

    match (token, record) {
        (None, None) => SessionState::default(),
        (Some(token), Some(record)) => match serde_json::from_str::<Identity>(&record) {
            Ok(identity) => {
                tracing::info!(user_id = %identity.id, "restored persisted session");
                SessionState::authenticated(Credential::new(token), identity)
            }
            Err(err) => {
                tracing::warn!(error = %err, "persisted identity is unreadable; starting logged out");
                forget(storage, config);
                SessionState::default()
            }
        },
        (token, _) => {
            tracing::warn!(
                has_token = token.is_some(),
                "persisted session is incomplete; starting logged out"
            );
            forget(storage, config);
            SessionState::default()
        }
    }
}

fn read_key(storage: &dyn KeyValueStore, key: &str) -> Option<String> {
    match storage.get(key) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, %key, "failed to read persisted session key");
            None
        }
    }
}

fn forget(storage: &dyn KeyValueStore, config: &SessionConfig) {
    for key in [&config.token_key, &config.identity_key] {
        if let Err(err) = storage.remove(key) {
            tracing::warn!(error = %err, %key, "failed to remove persisted session key");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use fiskal_auth::CoarseRole;
    use fiskal_core::UserId;
    use proptest::prelude::*;

    use super::*;
    use crate::storage::InMemoryStore;

    fn identity(roles: &[&'static str]) -> Identity {
        Identity::new(UserId::new(7), "ops@example.com")
            .with_name("Ops", "Team")
            .with_roles(roles.iter().copied())
    }

    fn store_on(storage: &InMemoryStore) -> SessionStore {
        SessionStore::hydrate(Arc::new(storage.clone()), SessionConfig::default())
    }

    fn assert_consistent(state: &SessionState) {
        assert_eq!(
            state.is_authenticated(),
            state.credential().is_some() && state.identity().is_some()
        );
    }

    #[test]
    fn set_auth_round_trips() {
        let storage = InMemoryStore::new();
        let store = store_on(&storage);
        let alice = identity(&["ROLE_USER"]);

        store.set_auth("tok-1", alice.clone());

        assert!(store.is_authenticated());
        assert_eq!(store.credential(), Some(Credential::new("tok-1")));
        assert_eq!(store.identity(), Some(alice));
        assert_eq!(storage.get("token").unwrap().as_deref(), Some("tok-1"));
        assert!(storage.contains("user"));
    }

    #[test]
    fn clear_auth_is_idempotent() {
        let storage = InMemoryStore::new();
        let store = store_on(&storage);
        store.set_auth("tok-1", identity(&["ROLE_USER"]));

        store.clear_auth();
        let once = store.snapshot();
        store.clear_auth();

        assert_eq!(store.snapshot(), once);
        assert!(!store.is_authenticated());
        assert!(storage.is_empty());
    }

    #[test]
    fn has_role_is_false_without_identity() {
        let store = store_on(&InMemoryStore::new());
        assert!(!store.has_role("ROLE_ADMIN"));
        assert!(!store.has_role(String::from("ROLE_USER")));
        assert!(!store.is_administrator());
    }

    #[test]
    fn has_role_accepts_either_spelling() {
        let store = store_on(&InMemoryStore::new());
        store.set_auth("tok", identity(&["ROLE_ADMIN"]));

        assert!(store.has_role("ADMIN"));
        assert!(store.has_role("ROLE_ADMIN"));
        assert!(!store.has_role("ROLE_USER"));
    }

    #[test]
    fn relogin_replaces_identity_wholesale() {
        let storage = InMemoryStore::new();
        let store = store_on(&storage);
        store.set_auth("tok-admin", identity(&["ROLE_ADMIN"]));

        let bob = Identity::new(UserId::new(8), "bob@example.com").with_roles(["ROLE_USER"]);
        store.set_auth("tok-bob", bob.clone());

        assert_eq!(store.identity(), Some(bob));
        assert_eq!(store.roles().role, Some(CoarseRole::User));
        assert_eq!(storage.get("token").unwrap().as_deref(), Some("tok-bob"));
    }

    #[test]
    fn garbage_input_is_stored_as_given() {
        let store = store_on(&InMemoryStore::new());
        let nobody = Identity::new(UserId::new(0), "");

        store.set_auth("", nobody.clone());

        assert!(store.is_authenticated());
        assert_eq!(store.identity(), Some(nobody));
        assert_eq!(store.roles().role, None);
    }

    #[test]
    fn hydrates_a_previous_session() {
        let storage = InMemoryStore::new();
        store_on(&storage).set_auth("tok-1", identity(&["ROLE_ADMIN"]));

        let restarted = store_on(&storage);
        assert!(restarted.is_authenticated());
        assert!(restarted.is_administrator());
        assert_eq!(restarted.credential(), Some(Credential::new("tok-1")));
    }

    #[test]
    fn corrupt_identity_starts_logged_out_and_is_wiped() {
        let storage = InMemoryStore::new();
        storage.set("token", "tok-1").unwrap();
        storage.set("user", "{not json").unwrap();

        let store = store_on(&storage);

        assert!(!store.is_authenticated());
        assert!(storage.is_empty());
    }

    #[test]
    fn token_without_identity_starts_logged_out() {
        let storage = InMemoryStore::new();
        storage.set("token", "tok-1").unwrap();

        let store = store_on(&storage);

        assert!(!store.is_authenticated());
        assert!(!storage.contains("token"));
    }

    #[test]
    fn identity_without_token_starts_logged_out() {
        let storage = InMemoryStore::new();
        storage
            .set("user", r#"{"id":1,"email":"a@example.com","roles":["ROLE_USER"]}"#)
            .unwrap();

        let store = store_on(&storage);

        assert!(!store.is_authenticated());
        assert!(storage.is_empty());
    }

    #[test]
    fn empty_ignores_what_was_persisted() {
        let storage = InMemoryStore::new();
        store_on(&storage).set_auth("tok-1", identity(&["ROLE_USER"]));

        let store = SessionStore::empty(Arc::new(storage.clone()), SessionConfig::default());

        assert!(!store.is_authenticated());
        assert!(storage.contains("token"));
    }

    #[test]
    fn honours_configured_keys() {
        let storage = InMemoryStore::new();
        let config = SessionConfig {
            token_key: "fiskal.token".to_string(),
            identity_key: "fiskal.user".to_string(),
            ..SessionConfig::default()
        };
        let store = SessionStore::hydrate(Arc::new(storage.clone()), config);

        store.set_auth("tok", identity(&["ROLE_USER"]));

        assert!(storage.contains("fiskal.token"));
        assert!(storage.contains("fiskal.user"));
        assert!(!storage.contains("token"));
    }

    #[test]
    fn subscribers_see_every_mutation() {
        let store = store_on(&InMemoryStore::new());
        let seen: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let id = store.subscribe(move |state| {
            sink.lock().unwrap().push(state.is_authenticated());
        });

        store.set_auth("tok", identity(&["ROLE_USER"]));
        store.clear_auth();
        assert!(store.unsubscribe(id));
        store.set_auth("tok", identity(&["ROLE_USER"]));

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn listeners_may_read_the_store() {
        let store = Arc::new(store_on(&InMemoryStore::new()));
        let admin_seen = Arc::new(AtomicUsize::new(0));

        let reader = Arc::clone(&store);
        let counter = Arc::clone(&admin_seen);
        store.subscribe(move |_| {
            if reader.is_administrator() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        store.set_auth("tok", identity(&["ROLE_ADMIN"]));
        assert_eq!(admin_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn switch_organization_persists() {
        let storage = InMemoryStore::new();
        let store = store_on(&storage);
        store.set_auth("tok", identity(&["ROLE_USER"]));

        assert!(store.switch_organization(OrganizationId::new(42)));

        let restarted = store_on(&storage);
        let identity = restarted.identity().unwrap();
        assert_eq!(identity.current_organization_id, Some(OrganizationId::new(42)));
    }

    #[test]
    fn switch_organization_without_session_is_a_noop() {
        let storage = InMemoryStore::new();
        let store = store_on(&storage);

        assert!(!store.switch_organization(OrganizationId::new(1)));
        assert!(!store.is_authenticated());
        assert!(storage.is_empty());
    }

    #[test]
    fn guard_follows_the_session() {
        let store = store_on(&InMemoryStore::new());
        let guard = store.route_guard([Role::ADMIN]);

        assert_eq!(
            store.evaluate(&guard),
            GuardDecision::Redirect {
                to: "/login".to_string(),
                replace: true
            }
        );

        store.set_auth("tok", identity(&["ROLE_ADMIN"]));
        assert!(store.evaluate(&guard).is_render());

        store.clear_auth();
        assert!(!store.evaluate(&guard).is_render());
    }

    #[test]
    fn permissions_follow_the_session() {
        let store = store_on(&InMemoryStore::new());
        assert!(store.has_permission(Action::View));
        assert!(!store.has_permission(Action::Edit));

        store.set_auth("tok", identity(&["ROLE_ADMIN", "ROLE_USER"]));
        assert!(store.has_permission(Action::Delete));
        assert!(store.has_any_role(&[Role::USER]));
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
    }

    #[test]
    fn storage_failures_never_reach_the_caller() {
        let store = SessionStore::hydrate(Arc::new(FailingStore), SessionConfig::default());
        assert!(!store.is_authenticated());

        store.set_auth("tok", identity(&["ROLE_USER"]));
        assert!(store.is_authenticated());

        store.clear_auth();
        assert!(!store.is_authenticated());
    }

    /// Shares an [`InMemoryStore`] but refuses writes to one key.
    struct RejectingKey {
        inner: InMemoryStore,
        rejected: &'static str,
    }

    impl KeyValueStore for RejectingKey {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == self.rejected {
                return Err(StorageError::Unavailable(format!("{key} is read-only")));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn failed_identity_write_does_not_resurrect_the_previous_user() {
        let storage = InMemoryStore::new();
        store_on(&storage).set_auth("tok-admin", identity(&["ROLE_ADMIN"]));

        let flaky = RejectingKey {
            inner: storage.clone(),
            rejected: "user",
        };
        let store = SessionStore::hydrate(Arc::new(flaky), SessionConfig::default());
        assert!(store.is_administrator());

        let clerk = Identity::new(UserId::new(2), "clerk@example.com").with_roles(["ROLE_USER"]);
        store.set_auth("tok-user", clerk.clone());

        // The running session is the new one even though it could not be saved.
        assert_eq!(store.identity(), Some(clerk));
        assert!(storage.is_empty());

        let reloaded = store_on(&storage);
        assert!(!reloaded.is_authenticated());
        assert!(!reloaded.is_administrator());
    }

    #[test]
    fn failed_credential_write_leaves_nothing_behind() {
        let storage = InMemoryStore::new();
        store_on(&storage).set_auth("tok-admin", identity(&["ROLE_ADMIN"]));

        let flaky = RejectingKey {
            inner: storage.clone(),
            rejected: "token",
        };
        let store = SessionStore::hydrate(Arc::new(flaky), SessionConfig::default());
        store.switch_organization(OrganizationId::new(3));

        assert!(store.is_authenticated());
        assert!(!store_on(&storage).is_authenticated());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Set(bool),
        Clear,
        Switch(i64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<bool>().prop_map(Op::Set),
            Just(Op::Clear),
            (1i64..100).prop_map(Op::Switch),
        ]
    }

    proptest! {
        /// Property: after any sequence of mutations, `authenticated` agrees
        /// with the presence of credential and identity, in memory and in a
        /// store rehydrated from what was persisted.
        #[test]
        fn authenticated_flag_is_always_consistent(ops in prop::collection::vec(op_strategy(), 0..20)) {
            let storage = InMemoryStore::new();
            let store = store_on(&storage);

            for op in ops {
                match op {
                    Op::Set(admin) => {
                        let roles: &[&'static str] = if admin { &["ROLE_ADMIN"] } else { &["ROLE_USER"] };
                        store.set_auth("tok", identity(roles));
                    }
                    Op::Clear => store.clear_auth(),
                    Op::Switch(org) => {
                        store.switch_organization(OrganizationId::new(org));
                    }
                }

                let state = store.snapshot();
                assert_consistent(&state);

                let rehydrated = store_on(&storage).snapshot();
                prop_assert_eq!(rehydrated, state);
            }
        }
    }
}
