//! Durable client-side key-value storage. Plain strings and JSON only; the
//! session store writes through here so state survives a restart.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Storage keys owned by the session layer.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "viatica.access_token";
    pub const REFRESH_TOKEN: &str = "viatica.refresh_token";
    pub const USER: &str = "viatica.user";
    pub const CURRENT_TENANT: &str = "viatica.current_tenant";
    pub const AVAILABLE_TENANTS: &str = "viatica.available_tenants";

    /// Every key wiped by the forced session clear.
    pub const SESSION_KEYS: &[&str] = &[
        ACCESS_TOKEN,
        REFRESH_TOKEN,
        USER,
        CURRENT_TENANT,
        AVAILABLE_TENANTS,
    ];
}

/// Caches scoped to the active tenant, purged whenever the tenant switches so
/// no view reuses data computed under the prior tenant. This is a deliberate
/// allow-list rather than a wildcard clear: unrelated application preferences
/// share the same storage. Any new tenant-scoped cache introduced elsewhere in
/// the application MUST register its key here, or tenant switches will leak
/// stale data.
pub const TENANT_SCOPED_CACHE_KEYS: &[&str] = &[
    "viatica.cache.dashboard_summary",
    "viatica.cache.trip_filters",
    "viatica.cache.invoice_filters",
    "viatica.cache.fleet_overview",
    "viatica.cache.recent_reports",
];

/// Minimal key-value contract, localStorage-shaped: string keys, string
/// values, infallible interface. Implementations log write failures rather
/// than surfacing them; the in-memory view stays authoritative.
pub trait KvStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
