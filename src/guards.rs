//! Route access predicates, evaluated synchronously before a navigation
//! completes. Pure read-only consumers of the session store: each guard maps a
//! route context to allow-or-redirect and performs no side effects itself; the
//! host router acts on the outcome.

use crate::nav::{ADMIN_HOME, CUSTOMER_HOME, LOGIN_PATH, UNAUTHORIZED_PATH};
use crate::session::{Role, SessionManager};

/// Access requirement attached to a route definition at route-table build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePermission {
    Roles(Vec<Role>),
    Permissions(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct RouteContext {
    /// The attempted URL, preserved for post-login return.
    pub path: String,
    pub permission: Option<RoutePermission>,
}

impl RouteContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), permission: None }
    }

    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        self.permission = Some(RoutePermission::Roles(roles));
        self
    }

    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permission = Some(RoutePermission::Permissions(permissions));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    Redirect(String),
}

impl GuardOutcome {
    pub fn is_allow(&self) -> bool {
        matches!(self, GuardOutcome::Allow)
    }
}

fn home_for(role: Role) -> &'static str {
    if role.is_administrative() { ADMIN_HOME } else { CUSTOMER_HOME }
}

/// Passes iff the session is authenticated; otherwise redirects to the login
/// surface with the attempted URL preserved.
pub fn auth_required(manager: &SessionManager, ctx: &RouteContext) -> GuardOutcome {
    if manager.is_authenticated() {
        GuardOutcome::Allow
    } else {
        GuardOutcome::Redirect(format!(
            "{}?redirect={}",
            LOGIN_PATH,
            urlencoding::encode(&ctx.path)
        ))
    }
}

/// Passes iff the user's role is in the allow-list.
pub fn role_allowed(manager: &SessionManager, roles: &[Role]) -> GuardOutcome {
    if manager.has_any_role(roles) {
        GuardOutcome::Allow
    } else {
        GuardOutcome::Redirect(UNAUTHORIZED_PATH.to_string())
    }
}

/// Passes iff the route declares no permissions, or the user holds at least
/// one of the declared permissions.
pub fn permission_allowed(manager: &SessionManager, permissions: &[String]) -> GuardOutcome {
    if permissions.is_empty() {
        return GuardOutcome::Allow;
    }
    let refs: Vec<&str> = permissions.iter().map(String::as_str).collect();
    if manager.has_any_permission(&refs) {
        GuardOutcome::Allow
    } else {
        GuardOutcome::Redirect(UNAUTHORIZED_PATH.to_string())
    }
}

/// For login-only routes: an already-authenticated user is sent straight to
/// their role's home surface instead of the login form.
pub fn redirect_if_authenticated(manager: &SessionManager) -> GuardOutcome {
    if !manager.is_authenticated() {
        return GuardOutcome::Allow;
    }
    let home = manager.user().map(|u| home_for(u.role)).unwrap_or(ADMIN_HOME);
    GuardOutcome::Redirect(home.to_string())
}

/// Full guard chain for a protected route: authentication first, then the
/// route's declared role or permission requirement.
pub fn evaluate(manager: &SessionManager, ctx: &RouteContext) -> GuardOutcome {
    match auth_required(manager, ctx) {
        GuardOutcome::Allow => {}
        redirect => return redirect,
    }
    match &ctx.permission {
        None => GuardOutcome::Allow,
        Some(RoutePermission::Roles(roles)) => role_allowed(manager, roles),
        Some(RoutePermission::Permissions(perms)) => permission_allowed(manager, perms),
    }
}
