//! Router hook. The crate never renders anything; when the session layer needs
//! to move the user (forced clear, guard redirects) it goes through the host
//! application's [`Navigator`].

use parking_lot::Mutex;

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
pub const ADMIN_HOME: &str = "/admin";
pub const CUSTOMER_HOME: &str = "/portal";

pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// For headless use and hosts that drive navigation themselves.
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _path: &str) {}
}

/// Records every navigation; used by test harnesses to assert redirect behavior.
#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self { Self::default() }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visits.lock().push(path.to_string());
    }
}
