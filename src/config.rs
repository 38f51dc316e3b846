//! Client configuration: API base URL, durable storage location and request
//! timeout. Values come from the environment with sensible defaults, same
//! shape as the server-side `VIATICA_*` variables.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is resolved against, e.g. `https://api.viatica.cl/api/`.
    pub api_base: String,
    /// JSON file backing the durable key-value session storage.
    pub storage_path: PathBuf,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:3000/api/".to_string(),
            storage_path: PathBuf::from("viatica_session.json"),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_base = std::env::var("VIATICA_API_BASE").unwrap_or(defaults.api_base);
        let storage_path = std::env::var("VIATICA_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_path);
        let request_timeout = std::env::var("VIATICA_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        Self { api_base, storage_path, request_timeout }
    }
}
