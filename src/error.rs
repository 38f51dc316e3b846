//! Unified error model for the session pipeline.
//! `AuthError` is the session-level taxonomy produced by the lifecycle
//! controller; `ApiError` is the normalized `{status, message, cause}` shape the
//! request pipeline surfaces to callers so feature code never branches on
//! transport-specific error shapes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level error code the backend attaches to a 403 when the access
/// token's tenant claim no longer matches the tenant the server expects.
pub const TENANT_MISMATCH_CODE: &str = "TENANT_MISMATCH";

/// Session-level failures. `RefreshFailed` and `TenantMismatch` are terminal to
/// the session: they are never retried and are always followed by the forced
/// session clear.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("no refresh token stored")]
    NoRefreshToken,
    #[error("token refresh rejected: {0}")]
    RefreshFailed(String),
    #[error("access token no longer valid for the active tenant")]
    TenantMismatch,
    #[error("network failure: {0}")]
    Network(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("session storage failure: {0}")]
    Storage(String),
}

impl AuthError {
    /// Errors that tear the session down rather than being returned for
    /// per-feature handling.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, AuthError::RefreshFailed(_) | AuthError::TenantMismatch)
    }
}

/// Normalized error surfaced by the request pipeline. `status` is the HTTP
/// status of the response, or 0 when the transport itself failed before a
/// status was available.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ApiError {
    pub fn new<S: Into<String>>(status: u16, message: S) -> Self {
        Self { status, message: message.into(), cause: None }
    }

    pub fn with_cause<S: Into<String>>(mut self, cause: S) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Transport-level failure: no HTTP status was produced.
    pub fn network<S: Into<String>>(cause: S) -> Self {
        Self { status: 0, message: "network failure".into(), cause: Some(cause.into()) }
    }

    pub fn is_unauthorized(&self) -> bool { self.status == 401 }

    pub fn is_tenant_mismatch(&self) -> bool {
        self.status == 403 && self.cause.as_deref() == Some(TENANT_MISMATCH_CODE)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "HTTP {}: {} ({})", self.status, self.message, cause),
            None => write!(f, "HTTP {}: {}", self.status, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(AuthError::RefreshFailed("expired".into()).is_fatal_to_session());
        assert!(AuthError::TenantMismatch.is_fatal_to_session());
        assert!(!AuthError::InvalidCredentials.is_fatal_to_session());
        assert!(!AuthError::NoRefreshToken.is_fatal_to_session());
        assert!(!AuthError::Unauthorized.is_fatal_to_session());
    }

    #[test]
    fn api_error_shape() {
        let err = ApiError::new(404, "trip not found").with_cause("TRIP_MISSING");
        assert_eq!(err.status, 404);
        assert_eq!(err.cause.as_deref(), Some("TRIP_MISSING"));
        assert!(!err.is_unauthorized());

        let net = ApiError::network("connection refused");
        assert_eq!(net.status, 0);
        assert_eq!(net.cause.as_deref(), Some("connection refused"));
    }

    #[test]
    fn tenant_mismatch_detection() {
        let err = ApiError::new(403, "forbidden").with_cause(TENANT_MISMATCH_CODE);
        assert!(err.is_tenant_mismatch());
        let plain = ApiError::new(403, "forbidden");
        assert!(!plain.is_tenant_mismatch());
    }
}
