//! JSON-file-backed storage. The whole map is rewritten on every mutation via
//! a temp-file rename so a crash mid-write never corrupts the previous state.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::RwLock;
use tracing::warn;

use super::KvStorage;

pub struct FileStorage {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileStorage {
    /// Open the store at `path`, loading any previously persisted entries.
    /// A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), "discarding unreadable session storage: {e}");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path, entries: RwLock::new(entries) }
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        let write = || -> std::io::Result<()> {
            if let Some(dir) = self.path.parent() {
                if !dir.as_os_str().is_empty() {
                    fs::create_dir_all(dir)?;
                }
            }
            let raw = serde_json::to_string_pretty(entries).map_err(std::io::Error::other)?;
            let tmp = self.path.with_extension("json.tmp");
            fs::write(&tmp, raw)?;
            fs::rename(&tmp, &self.path)
        };
        if let Err(e) = write() {
            warn!(path = %self.path.display(), "session storage write failed: {e}");
        }
    }
}

impl KvStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write();
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");

        let store = FileStorage::open(&path);
        store.set("viatica.access_token", "tok-1");
        store.set("viatica.user", r#"{"id":"u1"}"#);
        store.remove("viatica.user");

        // A second instance sees only what survived.
        let reopened = FileStorage::open(&path);
        assert_eq!(reopened.get("viatica.access_token").as_deref(), Some("tok-1"));
        assert_eq!(reopened.get("viatica.user"), None);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json at all").expect("seed");

        let store = FileStorage::open(&path);
        assert_eq!(store.get("viatica.access_token"), None);
    }
}
