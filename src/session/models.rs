//! Wire and session models. The backend speaks camelCase JSON; optional
//! collections default to empty so older backend payloads keep parsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Accountant,
    Operator,
    Customer,
}

impl Role {
    /// Everything except the customer portal role counts as back-office staff.
    pub fn is_administrative(self) -> bool {
        !matches!(self, Role::Customer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// An organization boundary the user can act within. Immutable once fetched;
/// determines data scoping for every domain request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: String,
    pub business_name: String,
    pub rut: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    /// The default tenant the session starts under.
    pub tenant: Tenant,
    #[serde(default)]
    pub available_tenants: Vec<Tenant>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchTenantResponse {
    pub access_token: String,
    pub tenant: Tenant,
    pub role: Role,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_response_parses_camel_case() {
        let raw = serde_json::json!({
            "user": {
                "id": "u1", "email": "ana@acme.cl", "name": "Ana", "role": "ADMIN",
                "permissions": ["trips:read"]
            },
            "accessToken": "at-1",
            "refreshToken": "rt-1",
            "tenant": {"id": "t1", "businessName": "Acme Ltda", "rut": "76.123.456-0"}
        });
        let parsed: LoginResponse = serde_json::from_value(raw).expect("parse");
        assert_eq!(parsed.user.role, Role::Admin);
        assert_eq!(parsed.tenant.business_name, "Acme Ltda");
        assert!(parsed.tenant.active, "active defaults to true");
        assert!(parsed.available_tenants.is_empty(), "missing list defaults to empty");
    }

    #[test]
    fn administrative_roles() {
        assert!(Role::Admin.is_administrative());
        assert!(Role::Accountant.is_administrative());
        assert!(!Role::Customer.is_administrative());
    }
}
