//! The session store: single source of truth for tokens, user, tenant context
//! and the derived flags. One observable cell per field, write-through to
//! durable storage on every mutation, rehydrated from storage at construction.
//!
//! Single-writer discipline: all setters are crate-private so only the
//! lifecycle controller mutates session state; the pipeline, guards and host
//! UI read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::Stream;
use tracing::warn;

use crate::storage::{keys, KvStorage, TENANT_SCOPED_CACHE_KEYS};

use super::cell::ObservedCell;
use super::models::{Tenant, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    RefreshingToken,
}

pub struct SessionStore {
    storage: Arc<dyn KvStorage>,
    access_token: ObservedCell<Option<String>>,
    refresh_token: ObservedCell<Option<String>>,
    user: ObservedCell<Option<User>>,
    current_tenant: ObservedCell<Option<Tenant>>,
    available_tenants: ObservedCell<Vec<Tenant>>,
    is_authenticated: ObservedCell<bool>,
    is_loading: ObservedCell<bool>,
    state: ObservedCell<SessionState>,
    /// Bumped on every access-token replacement (login, refresh, tenant
    /// switch, clear). Lets concurrent refresh callers detect that the token
    /// they saw fail has already been replaced.
    token_epoch: AtomicU64,
}

fn read_json<T: serde::de::DeserializeOwned>(storage: &dyn KvStorage, key: &str) -> Option<T> {
    let raw = storage.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, "discarding unreadable persisted value: {e}");
            None
        }
    }
}

fn write_json<T: serde::Serialize>(storage: &dyn KvStorage, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => storage.set(key, &raw),
        Err(e) => warn!(key, "failed to serialize session value: {e}"),
    }
}

impl SessionStore {
    /// Rehydrate from durable storage. The session counts as authenticated
    /// only when both an access token and a user survived.
    pub fn new(storage: Arc<dyn KvStorage>) -> Self {
        let access_token = storage.get(keys::ACCESS_TOKEN);
        let refresh_token = storage.get(keys::REFRESH_TOKEN);
        let user: Option<User> = read_json(storage.as_ref(), keys::USER);
        let current_tenant: Option<Tenant> = read_json(storage.as_ref(), keys::CURRENT_TENANT);
        let available_tenants: Vec<Tenant> =
            read_json(storage.as_ref(), keys::AVAILABLE_TENANTS).unwrap_or_default();

        let authenticated = access_token.is_some() && user.is_some();
        let state = if authenticated {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        };

        Self {
            storage,
            access_token: ObservedCell::new(access_token),
            refresh_token: ObservedCell::new(refresh_token),
            user: ObservedCell::new(user),
            current_tenant: ObservedCell::new(current_tenant),
            available_tenants: ObservedCell::new(available_tenants),
            is_authenticated: ObservedCell::new(authenticated),
            is_loading: ObservedCell::new(false),
            state: ObservedCell::new(state),
            token_epoch: AtomicU64::new(0),
        }
    }

    // --- synchronous reads ---

    pub fn access_token(&self) -> Option<String> { self.access_token.get() }
    pub fn refresh_token(&self) -> Option<String> { self.refresh_token.get() }
    pub fn user(&self) -> Option<User> { self.user.get() }
    pub fn current_tenant(&self) -> Option<Tenant> { self.current_tenant.get() }
    pub fn available_tenants(&self) -> Vec<Tenant> { self.available_tenants.get() }
    pub fn is_authenticated(&self) -> bool { self.is_authenticated.get() }
    pub fn is_loading(&self) -> bool { self.is_loading.get() }
    pub fn state(&self) -> SessionState { self.state.get() }

    pub(crate) fn token_epoch(&self) -> u64 {
        self.token_epoch.load(Ordering::SeqCst)
    }

    // --- observable change streams (replay-latest) ---

    pub fn observe_user(&self) -> impl Stream<Item = Option<User>> + Send + Unpin {
        self.user.stream()
    }

    pub fn observe_current_tenant(&self) -> impl Stream<Item = Option<Tenant>> + Send + Unpin {
        self.current_tenant.stream()
    }

    pub fn observe_is_authenticated(&self) -> impl Stream<Item = bool> + Send + Unpin {
        self.is_authenticated.stream()
    }

    pub fn observe_is_loading(&self) -> impl Stream<Item = bool> + Send + Unpin {
        self.is_loading.stream()
    }

    pub fn observe_state(&self) -> impl Stream<Item = SessionState> + Send + Unpin {
        self.state.stream()
    }

    // --- write-through setters (lifecycle controller only) ---

    pub(crate) fn set_access_token(&self, token: Option<String>) {
        match &token {
            Some(value) => self.storage.set(keys::ACCESS_TOKEN, value),
            None => self.storage.remove(keys::ACCESS_TOKEN),
        }
        self.access_token.set(token);
        self.token_epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn set_refresh_token(&self, token: Option<String>) {
        match &token {
            Some(value) => self.storage.set(keys::REFRESH_TOKEN, value),
            None => self.storage.remove(keys::REFRESH_TOKEN),
        }
        self.refresh_token.set(token);
    }

    /// Atomic replacement of the token pair after a successful refresh.
    pub(crate) fn replace_tokens(&self, access: String, refresh: String) {
        self.set_refresh_token(Some(refresh));
        self.set_access_token(Some(access));
    }

    pub(crate) fn set_user(&self, user: Option<User>) {
        match &user {
            Some(value) => write_json(self.storage.as_ref(), keys::USER, value),
            None => self.storage.remove(keys::USER),
        }
        self.user.set(user);
    }

    pub(crate) fn set_current_tenant(&self, tenant: Option<Tenant>) {
        match &tenant {
            Some(value) => write_json(self.storage.as_ref(), keys::CURRENT_TENANT, value),
            None => self.storage.remove(keys::CURRENT_TENANT),
        }
        self.current_tenant.set(tenant);
    }

    pub(crate) fn set_available_tenants(&self, tenants: Vec<Tenant>) {
        write_json(self.storage.as_ref(), keys::AVAILABLE_TENANTS, &tenants);
        self.available_tenants.set(tenants);
    }

    pub(crate) fn set_authenticated(&self, value: bool) {
        self.is_authenticated.set(value);
    }

    pub(crate) fn set_loading(&self, value: bool) {
        self.is_loading.set(value);
    }

    pub(crate) fn set_state(&self, value: SessionState) {
        self.state.set(value);
    }

    /// Purge every registered tenant-scoped cache key from durable storage.
    pub(crate) fn purge_tenant_caches(&self) {
        for key in TENANT_SCOPED_CACHE_KEYS {
            self.storage.remove(key);
        }
    }

    /// Wipe the whole session from memory and storage. Leaves `is_loading`
    /// untouched; callers manage the loading flag around their own exchanges.
    pub(crate) fn clear(&self) {
        for key in keys::SESSION_KEYS {
            self.storage.remove(key);
        }
        self.set_access_token(None);
        self.refresh_token.set(None);
        self.user.set(None);
        self.current_tenant.set(None);
        self.available_tenants.set(Vec::new());
        self.is_authenticated.set(false);
        self.state.set(SessionState::Unauthenticated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn user() -> User {
        serde_json::from_value(serde_json::json!({
            "id": "u1", "email": "ana@acme.cl", "name": "Ana", "role": "ADMIN"
        }))
        .expect("user")
    }

    #[test]
    fn writes_through_to_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());

        store.set_access_token(Some("at-1".into()));
        store.set_user(Some(user()));

        assert_eq!(storage.get(keys::ACCESS_TOKEN).as_deref(), Some("at-1"));
        assert!(storage.get(keys::USER).is_some(), "user persisted as JSON");
    }

    #[test]
    fn rehydrates_persisted_session() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let store = SessionStore::new(storage.clone());
            store.set_access_token(Some("at-1".into()));
            store.set_refresh_token(Some("rt-1".into()));
            store.set_user(Some(user()));
            store.set_authenticated(true);
        }

        let restored = SessionStore::new(storage);
        assert_eq!(restored.access_token().as_deref(), Some("at-1"));
        assert!(restored.is_authenticated(), "token + user imply authenticated");
        assert_eq!(restored.state(), SessionState::Authenticated);
    }

    #[test]
    fn token_epoch_advances_on_replacement() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        let before = store.token_epoch();
        store.replace_tokens("at-2".into(), "rt-2".into());
        assert!(store.token_epoch() > before);
    }

    #[test]
    fn clear_wipes_memory_and_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());
        store.set_access_token(Some("at-1".into()));
        store.set_refresh_token(Some("rt-1".into()));
        store.set_user(Some(user()));
        store.set_authenticated(true);

        store.clear();

        for key in keys::SESSION_KEYS {
            assert!(storage.get(key).is_none(), "{key} should be removed");
        }
        assert!(store.access_token().is_none());
        assert!(!store.is_authenticated());
        assert_eq!(store.state(), SessionState::Unauthenticated);
    }
}
