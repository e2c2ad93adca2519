//! Effective client settings.
//!
//! The relay URL comes from, in order: `--server` / `VAJRA_SERVER_URL`, the
//! URL saved with `vajra config set-server`, then [`DEFAULT_SERVER_URL`].

use std::path::{Path, PathBuf};

use vajra_core::storage::{self, FileStore};
use vajra_core::Result;

/// Relay used when nothing else is configured
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

const STORE_FILE: &str = "store.json";

/// Trim whitespace and a trailing slash
pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Pick the relay URL by precedence
pub fn resolve_server_url(flag: Option<&str>, stored: Option<&str>) -> String {
    flag.or(stored)
        .map(normalize_url)
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
}

/// Platform data directory for VajraShare
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vajrashare")
}

/// Open the store inside `data_dir`
pub fn open_store(data_dir: &Path) -> Result<FileStore> {
    FileStore::open(data_dir.join(STORE_FILE))
}

/// Settings resolved for one invocation
#[derive(Debug)]
pub struct Settings {
    /// Local store
    pub store: FileStore,
    /// Relay base URL, without trailing slash
    pub server_url: String,
}

impl Settings {
    /// Resolve settings from flags and the store under `data_dir`
    pub fn load(data_dir: Option<PathBuf>, server: Option<&str>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        let store = open_store(&data_dir)?;
        let stored = storage::load_server_url(&store)?;
        let server_url = resolve_server_url(server, stored.as_deref());
        tracing::debug!(
            store = %store.path().display(),
            server = %server_url,
            "Settings loaded"
        );
        Ok(Self { store, server_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("https://relay.test/"), "https://relay.test");
        assert_eq!(normalize_url(" https://relay.test "), "https://relay.test");
        assert_eq!(normalize_url("https://relay.test"), "https://relay.test");
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            resolve_server_url(Some("http://flag/"), Some("http://stored")),
            "http://flag"
        );
        assert_eq!(resolve_server_url(None, Some("http://stored/")), "http://stored");
        assert_eq!(resolve_server_url(None, None), DEFAULT_SERVER_URL);
        assert_eq!(resolve_server_url(Some("  "), None), DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_settings_use_stored_url() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open_store(dir.path()).unwrap();
            storage::save_server_url(&store, "http://saved.test/").unwrap();
        }

        let settings = Settings::load(Some(dir.path().to_path_buf()), None).unwrap();
        assert_eq!(settings.server_url, "http://saved.test");
        assert_eq!(settings.store.path(), dir.path().join(STORE_FILE));

        let settings =
            Settings::load(Some(dir.path().to_path_buf()), Some("http://flag.test")).unwrap();
        assert_eq!(settings.server_url, "http://flag.test");
    }
}
