//! Key/value storage for wallet auth data (`<prefix>_wallet_auth_key`).
//!
//! The browser uses `window.localStorage`; native builds keep a small JSON map
//! next to the credentials.

use crate::error::{Error, Result};
use crate::library::MaybeSendSync;
use std::collections::HashMap;
use std::sync::Mutex;

pub trait SessionStore: MaybeSendSync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().map_err(|_| Error::Lock("session store"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| Error::Lock("session store"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| Error::Lock("session store"))?;
        items.remove(key);
        Ok(())
    }
}

#[cfg(feature = "native")]
pub use file::FileSessionStore;

#[cfg(feature = "native")]
mod file {
    use super::SessionStore;
    use crate::error::{Error, Result};
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// JSON object persisted at a single path; rewritten on every change.
    #[derive(Debug)]
    pub struct FileSessionStore {
        path: PathBuf,
        guard: Mutex<()>,
    }

    impl FileSessionStore {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into(), guard: Mutex::new(()) }
        }

        fn read_map(&self) -> Result<BTreeMap<String, String>> {
            match std::fs::read_to_string(&self.path) {
                Ok(raw) => Ok(serde_json::from_str(&raw)?),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
                Err(e) => Err(e.into()),
            }
        }

        fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.path, serde_json::to_string_pretty(map)?)?;
            Ok(())
        }
    }

    impl SessionStore for FileSessionStore {
        fn get_item(&self, key: &str) -> Result<Option<String>> {
            let _lock = self.guard.lock().map_err(|_| Error::Lock("session file"))?;
            Ok(self.read_map()?.remove(key))
        }

        fn set_item(&self, key: &str, value: &str) -> Result<()> {
            let _lock = self.guard.lock().map_err(|_| Error::Lock("session file"))?;
            let mut map = self.read_map()?;
            map.insert(key.to_string(), value.to_string());
            self.write_map(&map)
        }

        fn remove_item(&self, key: &str) -> Result<()> {
            let _lock = self.guard.lock().map_err(|_| Error::Lock("session file"))?;
            let mut map = self.read_map()?;
            if map.remove(key).is_some() {
                self.write_map(&map)?;
            }
            Ok(())
        }
    }
}

#[cfg(all(test, feature = "native"))]
mod tests {
    use super::*;

    #[test]
    fn test_file_session_persists() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("session.json");

        let store = FileSessionStore::new(&path);
        assert_eq!(store.get_item("app_wallet_auth_key").unwrap(), None);
        store.set_item("app_wallet_auth_key", r#"{"accountId":"alice.testnet"}"#).unwrap();

        let reopened = FileSessionStore::new(&path);
        assert_eq!(
            reopened.get_item("app_wallet_auth_key").unwrap().as_deref(),
            Some(r#"{"accountId":"alice.testnet"}"#)
        );

        reopened.remove_item("app_wallet_auth_key").unwrap();
        assert_eq!(store.get_item("app_wallet_auth_key").unwrap(), None);
    }
}
