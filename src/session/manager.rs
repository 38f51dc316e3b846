//! Session lifecycle controller: the state machine and the only write path
//! into the session store. Login, logout, coalesced token refresh, tenant
//! switch and the forced session clear all live here; the pipeline, guards
//! and host UI only read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::ClientConfig;
use crate::error::{AuthError, TENANT_MISMATCH_CODE};
use crate::http::request::{self, ApiRequest};
use crate::http::transport::{HttpTransport, ReqwestTransport, TransportError};
use crate::nav::{Navigator, NoopNavigator, LOGIN_PATH};
use crate::storage::{FileStorage, KvStorage};

use super::models::{LoginResponse, RefreshResponse, Role, SwitchTenantResponse, Tenant, User};
use super::store::{SessionState, SessionStore};

pub struct SessionManager {
    store: SessionStore,
    transport: Arc<dyn HttpTransport>,
    navigator: Arc<dyn Navigator>,
    /// Serializes token refresh so concurrent 401s coalesce into one exchange.
    refresh_gate: Mutex<()>,
    /// Guards the forced clear: only the first caller redirects.
    cleared: AtomicBool,
}

impl SessionManager {
    pub fn new(
        storage: Arc<dyn KvStorage>,
        transport: Arc<dyn HttpTransport>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            store: SessionStore::new(storage),
            transport,
            navigator,
            refresh_gate: Mutex::new(()),
            cleared: AtomicBool::new(false),
        }
    }

    /// Convenience constructor wiring the file storage and reqwest transport
    /// from a config. Hosts that drive navigation pass their own navigator
    /// through [`SessionManager::new`].
    pub fn from_config(config: &ClientConfig) -> Result<Arc<Self>, TransportError> {
        let storage = Arc::new(FileStorage::open(&config.storage_path));
        let transport = Arc::new(ReqwestTransport::new(config)?);
        Ok(Arc::new(Self::new(storage, transport, Arc::new(NoopNavigator))))
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    // --- synchronous reads ---

    pub fn access_token(&self) -> Option<String> { self.store.access_token() }
    pub fn user(&self) -> Option<User> { self.store.user() }
    pub fn current_tenant(&self) -> Option<Tenant> { self.store.current_tenant() }
    pub fn available_tenants(&self) -> Vec<Tenant> { self.store.available_tenants() }
    pub fn is_authenticated(&self) -> bool { self.store.is_authenticated() }
    pub fn is_loading(&self) -> bool { self.store.is_loading() }
    pub fn state(&self) -> SessionState { self.store.state() }

    pub(crate) fn token_epoch(&self) -> u64 {
        self.store.token_epoch()
    }

    // --- role/permission predicates (no network) ---

    pub fn has_role(&self, role: Role) -> bool {
        self.store.user().map(|u| u.role == role).unwrap_or(false)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.store.user().map(|u| roles.contains(&u.role)).unwrap_or(false)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.store
            .user()
            .map(|u| u.permissions.iter().any(|p| p == permission))
            .unwrap_or(false)
    }

    pub fn has_any_permission(&self, permissions: &[&str]) -> bool {
        permissions.iter().any(|p| self.has_permission(p))
    }

    // --- lifecycle operations ---

    /// Exchange credentials for a session. On success the store is populated
    /// atomically from the response; on failure the session is left untouched
    /// and the error surfaced. The loading flag drops on both paths.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let previous = self.store.state();
        self.store.set_state(SessionState::Authenticating);
        self.store.set_loading(true);
        let outcome = self.exchange_credentials(email, password).await;
        self.store.set_loading(false);
        match outcome {
            Ok(login) => {
                self.apply_login(&login);
                self.store.set_state(SessionState::Authenticated);
                info!(user_id = %login.user.id, tenant_id = %login.tenant.id, "login succeeded");
                Ok(login.user)
            }
            Err(err) => {
                self.store.set_state(previous);
                warn!(error = %err, "login rejected");
                Err(err)
            }
        }
    }

    async fn exchange_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, AuthError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let req = ApiRequest::post(request::LOGIN_ENDPOINT, body);
        let resp = self
            .transport
            .send(req)
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        match resp.status {
            400 | 401 | 422 => return Err(AuthError::InvalidCredentials),
            status if !resp.is_success() => {
                return Err(AuthError::Network(format!("login failed with status {status}")))
            }
            _ => {}
        }
        resp.json::<LoginResponse>()
            .map_err(|e| AuthError::Network(format!("invalid login response: {e}")))
    }

    fn apply_login(&self, login: &LoginResponse) {
        self.store.set_refresh_token(Some(login.refresh_token.clone()));
        self.store.set_user(Some(login.user.clone()));
        self.store.set_current_tenant(Some(login.tenant.clone()));
        let tenants = if login.available_tenants.is_empty() {
            vec![login.tenant.clone()]
        } else {
            login.available_tenants.clone()
        };
        self.store.set_available_tenants(tenants);
        self.store.set_access_token(Some(login.access_token.clone()));
        self.store.set_authenticated(true);
        self.cleared.store(false, Ordering::SeqCst);
    }

    /// Mint a new token pair from the stored refresh token. Fails fast with
    /// [`AuthError::NoRefreshToken`] when nothing is stored (no network call).
    /// Any other failure is terminal: the session is cleared and never retried.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        self.refresh_from(self.store.token_epoch()).await
    }

    /// Refresh on behalf of a request whose token belonged to `observed_epoch`.
    /// Callers that arrive while another refresh holds the gate see the epoch
    /// advance and reuse the fresh token instead of issuing a second exchange.
    pub(crate) async fn refresh_from(&self, observed_epoch: u64) -> Result<(), AuthError> {
        let _gate = self.refresh_gate.lock().await;
        if self.store.token_epoch() != observed_epoch {
            return if self.store.access_token().is_some() {
                Ok(())
            } else {
                Err(AuthError::RefreshFailed(
                    "session was cleared while a refresh was pending".into(),
                ))
            };
        }
        let Some(refresh_token) = self.store.refresh_token() else {
            return Err(AuthError::NoRefreshToken);
        };

        self.store.set_state(SessionState::RefreshingToken);
        self.store.set_loading(true);
        let outcome = self.exchange_refresh(&refresh_token).await;
        self.store.set_loading(false);
        match outcome {
            Ok(pair) => {
                self.store.replace_tokens(pair.access_token, pair.refresh_token);
                self.store.set_state(SessionState::Authenticated);
                info!("access token refreshed");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "token refresh failed; clearing session");
                self.clear_session_and_redirect();
                Err(err)
            }
        }
    }

    async fn exchange_refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AuthError> {
        let body = serde_json::json!({ "refreshToken": refresh_token });
        let req = ApiRequest::post(request::REFRESH_ENDPOINT, body);
        let resp = self
            .transport
            .send(req)
            .await
            .map_err(|e| AuthError::RefreshFailed(format!("transport: {e}")))?;
        if !resp.is_success() {
            return Err(AuthError::RefreshFailed(format!("status {}", resp.status)));
        }
        resp.json::<RefreshResponse>()
            .map_err(|e| AuthError::RefreshFailed(format!("invalid refresh response: {e}")))
    }

    /// Revoke the refresh token (best effort) and clear the session locally.
    /// A failing revoke call is logged and never blocks local sign-out.
    pub async fn logout(&self) {
        self.store.set_loading(true);
        if let Some(refresh_token) = self.store.refresh_token() {
            let body = serde_json::json!({ "refreshToken": refresh_token });
            let req = ApiRequest::post(request::LOGOUT_ENDPOINT, body);
            match self.transport.send(req).await {
                Ok(resp) if resp.is_success() => info!("refresh token revoked"),
                Ok(resp) => warn!(status = resp.status, "logout revoke rejected"),
                Err(err) => warn!(error = %err, "logout revoke failed"),
            }
        }
        self.store.set_loading(false);
        self.clear_session_and_redirect();
    }

    /// Exchange the current access token for one scoped to `tenant_id`, then
    /// purge every tenant-scoped cache so no view reuses data computed under
    /// the prior tenant.
    pub async fn switch_tenant(&self, tenant_id: &str) -> Result<Tenant, AuthError> {
        let Some(token) = self.store.access_token() else {
            return Err(AuthError::Unauthorized);
        };
        self.store.set_loading(true);
        let body = serde_json::json!({ "tenantId": tenant_id });
        let req = self.authed(ApiRequest::post(request::SWITCH_TENANT_ENDPOINT, body), &token);
        let outcome = self.transport.send(req).await;
        self.store.set_loading(false);

        let resp = outcome.map_err(|e| AuthError::Network(e.to_string()))?;
        if resp.status == 403 && resp.error_code() == Some(TENANT_MISMATCH_CODE) {
            error!(tenant_id, "tenant switch rejected with tenant mismatch; clearing session");
            self.clear_session_and_redirect();
            return Err(AuthError::TenantMismatch);
        }
        if resp.status == 401 {
            return Err(AuthError::Unauthorized);
        }
        if !resp.is_success() {
            return Err(AuthError::Network(format!(
                "tenant switch failed with status {}",
                resp.status
            )));
        }
        let switched: SwitchTenantResponse = resp
            .json()
            .map_err(|e| AuthError::Network(format!("invalid switch response: {e}")))?;

        self.store.set_access_token(Some(switched.access_token.clone()));
        self.store.set_current_tenant(Some(switched.tenant.clone()));
        if let Some(mut user) = self.store.user() {
            user.role = switched.role;
            user.permissions = switched.permissions.clone();
            self.store.set_user(Some(user));
        }
        self.store.purge_tenant_caches();
        info!(tenant_id = %switched.tenant.id, "tenant switched");
        Ok(switched.tenant)
    }

    /// Re-read the profile from the backend, e.g. after a permission change.
    pub async fn resync_user(&self) -> Result<User, AuthError> {
        let Some(token) = self.store.access_token() else {
            return Err(AuthError::Unauthorized);
        };
        let req = self.authed(ApiRequest::get(request::ME_ENDPOINT), &token);
        let resp = self
            .transport
            .send(req)
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        if resp.status == 401 {
            return Err(AuthError::Unauthorized);
        }
        if !resp.is_success() {
            return Err(AuthError::Network(format!(
                "profile resync failed with status {}",
                resp.status
            )));
        }
        let user: User = resp
            .json()
            .map_err(|e| AuthError::Network(format!("invalid profile response: {e}")))?;
        self.store.set_user(Some(user.clone()));
        Ok(user)
    }

    /// Re-fetch the tenants this user may switch into.
    pub async fn fetch_available_tenants(&self) -> Result<Vec<Tenant>, AuthError> {
        let Some(token) = self.store.access_token() else {
            return Err(AuthError::Unauthorized);
        };
        let req = self.authed(ApiRequest::get(request::MY_TENANTS_ENDPOINT), &token);
        let resp = self
            .transport
            .send(req)
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        if resp.status == 401 {
            return Err(AuthError::Unauthorized);
        }
        if !resp.is_success() {
            return Err(AuthError::Network(format!(
                "tenant list fetch failed with status {}",
                resp.status
            )));
        }
        let tenants: Vec<Tenant> = resp
            .json()
            .map_err(|e| AuthError::Network(format!("invalid tenant list: {e}")))?;
        self.store.set_available_tenants(tenants.clone());
        Ok(tenants)
    }

    /// The single exit path for logout and irrecoverable failures: wipe
    /// memory and storage, drop to unauthenticated, redirect to the login
    /// surface. Idempotent; concurrent callers beyond the first are no-ops.
    pub fn clear_session_and_redirect(&self) {
        if self.cleared.swap(true, Ordering::SeqCst) {
            return;
        }
        self.store.clear();
        info!("session cleared; redirecting to login");
        self.navigator.navigate(LOGIN_PATH);
    }

    fn authed(&self, req: ApiRequest, token: &str) -> ApiRequest {
        let mut out = request::with_bearer(&req, token);
        if let Some(tenant) = self.store.current_tenant() {
            out = request::with_tenant(&out, &tenant.id);
        }
        out
    }
}
