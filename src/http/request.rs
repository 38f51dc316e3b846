//! Framework-agnostic request/response values and the pure request transforms
//! the pipeline is built from. Transforms always return a modified clone; the
//! original request is never mutated, so a retry can re-prepare from the
//! caller's untouched request.

use std::collections::HashSet;

use once_cell::sync::Lazy;

pub const AUTH_HEADER: &str = "Authorization";
pub const TENANT_HEADER: &str = "X-Tenant-ID";

pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REGISTER_ENDPOINT: &str = "/auth/register";
pub const FORGOT_PASSWORD_ENDPOINT: &str = "/auth/forgot-password";
pub const RESET_PASSWORD_ENDPOINT: &str = "/auth/reset-password";
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";
pub const LOGOUT_ENDPOINT: &str = "/auth/logout";
pub const SWITCH_TENANT_ENDPOINT: &str = "/auth/switch-tenant";
pub const ME_ENDPOINT: &str = "/auth/me";
pub const MY_TENANTS_ENDPOINT: &str = "/tenants/my-tenants";

/// Paths that never carry a bearer token.
static EXEMPT_PATHS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        LOGIN_ENDPOINT,
        REGISTER_ENDPOINT,
        FORGOT_PASSWORD_ENDPOINT,
        RESET_PASSWORD_ENDPOINT,
        REFRESH_ENDPOINT,
        LOGOUT_ENDPOINT,
    ]
    .into_iter()
    .collect()
});

fn path_component(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

/// Exemption is decided on the path component alone; the query is ignored.
pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS.contains(path_component(path))
}

pub fn is_refresh_path(path: &str) -> bool {
    path_component(path) == REFRESH_ENDPOINT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Root-relative path, resolved against the configured API base,
    /// e.g. `/trips?page=2`.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), headers: Vec::new(), body: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        let mut req = Self::new(Method::Post, path);
        req.body = Some(body);
        req
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        let mut req = Self::new(Method::Put, path);
        req.body = Some(body);
        req
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Set a header, replacing any existing value under the same name.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }
}

/// Token injection: clone with `Authorization: Bearer <token>` attached.
pub fn with_bearer(req: &ApiRequest, token: &str) -> ApiRequest {
    req.clone().with_header(AUTH_HEADER, &format!("Bearer {token}"))
}

/// Tenant injection: clone with `X-Tenant-ID` attached.
pub fn with_tenant(req: &ApiRequest, tenant_id: &str) -> ApiRequest {
    req.clone().with_header(TENANT_HEADER, tenant_id)
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Application-level error code, e.g. `TENANT_MISMATCH`.
    pub fn error_code(&self) -> Option<&str> {
        self.body.get("code").and_then(|v| v.as_str())
    }

    pub fn error_message(&self) -> Option<&str> {
        self.body.get("message").and_then(|v| v.as_str())
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exemption_covers_the_six_auth_endpoints() {
        for path in [
            "/auth/login",
            "/auth/register",
            "/auth/forgot-password",
            "/auth/reset-password",
            "/auth/refresh",
            "/auth/logout",
        ] {
            assert!(is_exempt(path), "{path} must be exempt");
        }
        assert!(!is_exempt("/trips"));
        assert!(!is_exempt("/auth/me"));
        assert!(!is_exempt("/auth/switch-tenant"));
    }

    #[test]
    fn exemption_ignores_the_query() {
        assert!(is_exempt("/auth/login?redirect=%2Ftrips"));
        assert!(!is_exempt("/trips?page=2"));
    }

    #[test]
    fn transforms_clone_and_replace() {
        let original = ApiRequest::get("/trips");
        let authed = with_bearer(&original, "tok-1");
        assert!(original.header(AUTH_HEADER).is_none(), "original never mutated");
        assert_eq!(authed.header(AUTH_HEADER), Some("Bearer tok-1"));

        // Re-preparing a retry replaces rather than duplicates the header.
        let retried = with_bearer(&authed, "tok-2");
        assert_eq!(retried.header(AUTH_HEADER), Some("Bearer tok-2"));
        let count = retried
            .headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(AUTH_HEADER))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn response_error_fields() {
        let resp = ApiResponse::new(
            403,
            serde_json::json!({"code": "TENANT_MISMATCH", "message": "tenant revoked"}),
        );
        assert!(!resp.is_success());
        assert_eq!(resp.error_code(), Some("TENANT_MISMATCH"));
        assert_eq!(resp.error_message(), Some("tenant revoked"));
    }
}
