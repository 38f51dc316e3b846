//! The request middleware chain, applied in fixed order to every outgoing
//! request: token injection, tenant injection, send, 401 recovery (single
//! coalesced refresh + one retransmit), tenant-mismatch handling, error
//! normalization. Stages one and two are pure transforms; only the recovery
//! stages call back into the lifecycle controller.

use std::sync::Arc;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{ApiError, TENANT_MISMATCH_CODE};
use crate::session::SessionManager;

use super::request::{self, ApiRequest, ApiResponse};
use super::transport::HttpTransport;

pub struct RequestPipeline {
    manager: Arc<SessionManager>,
    transport: Arc<dyn HttpTransport>,
}

fn normalize(resp: &ApiResponse) -> ApiError {
    let message = resp.error_message().unwrap_or("request failed").to_string();
    let mut err = ApiError::new(resp.status, message);
    if let Some(code) = resp.error_code() {
        err = err.with_cause(code);
    }
    err
}

impl RequestPipeline {
    pub fn new(manager: Arc<SessionManager>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { manager, transport }
    }

    /// Stages 1-2: bearer token (unless the path is exempt) and tenant header,
    /// each applied to a clone. Re-run on retry so the retransmit sees the
    /// freshly minted token.
    fn prepare(&self, req: &ApiRequest) -> ApiRequest {
        let mut prepared = req.clone();
        if !request::is_exempt(&req.path) {
            if let Some(token) = self.manager.access_token() {
                prepared = request::with_bearer(&prepared, &token);
            }
        }
        if let Some(tenant) = self.manager.current_tenant() {
            prepared = request::with_tenant(&prepared, &tenant.id);
        }
        prepared
    }

    pub async fn execute(&self, req: ApiRequest) -> Result<ApiResponse, ApiError> {
        let request_id = Uuid::new_v4();
        let epoch = self.manager.token_epoch();
        let prepared = self.prepare(&req);
        debug!(%request_id, path = %req.path, "dispatching request");

        let resp = match self.transport.send(prepared).await {
            Ok(resp) => resp,
            Err(e) => return Err(ApiError::network(e.to_string())),
        };

        if resp.status == 401 && !request::is_refresh_path(&req.path) {
            warn!(%request_id, path = %req.path, "401 received; attempting token refresh");
            return match self.manager.refresh_from(epoch).await {
                Ok(()) => {
                    let retried = self.prepare(&req);
                    match self.transport.send(retried).await {
                        Ok(second) => self.finish(request_id, &req, second),
                        Err(e) => Err(ApiError::network(e.to_string())),
                    }
                }
                Err(refresh_err) => {
                    // The caller gets the original 401; the session is torn down.
                    debug!(%request_id, error = %refresh_err, "refresh failed; surfacing original 401");
                    self.manager.clear_session_and_redirect();
                    Err(normalize(&resp))
                }
            };
        }

        self.finish(request_id, &req, resp)
    }

    /// Stages 4-5: tenant-mismatch teardown and error normalization. Applied
    /// to first responses and retransmits alike; never triggers another retry.
    fn finish(
        &self,
        request_id: Uuid,
        req: &ApiRequest,
        resp: ApiResponse,
    ) -> Result<ApiResponse, ApiError> {
        if resp.status == 403 && resp.error_code() == Some(TENANT_MISMATCH_CODE) {
            error!(%request_id, path = %req.path, "tenant mismatch; clearing session");
            self.manager.clear_session_and_redirect();
            return Err(normalize(&resp));
        }
        if resp.is_success() {
            debug!(%request_id, path = %req.path, status = resp.status, "request completed");
            return Ok(resp);
        }
        Err(normalize(&resp))
    }
}
