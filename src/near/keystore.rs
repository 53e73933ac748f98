//! Credential-storage strategies for access keys.
//!
//! - `InMemoryKeyStore`: ephemeral, used by tests and one-shot tools
//! - `FileKeyStore`: `<root>/<network>/<account>.json`, the near-cli layout (native)
//! - `BrowserLocalStorageKeyStore`: lives in [`crate::wasm`]

use super::keys::KeyPair;
use crate::error::{Error, Result};
use crate::library::MaybeSendSync;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
pub trait KeyStore: MaybeSendSync {
    async fn set_key(&self, network_id: &str, account_id: &str, key: KeyPair) -> Result<()>;
    async fn get_key(&self, network_id: &str, account_id: &str) -> Result<Option<KeyPair>>;
    async fn remove_key(&self, network_id: &str, account_id: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
    async fn get_networks(&self) -> Result<Vec<String>>;
    async fn get_accounts(&self, network_id: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    keys: Mutex<BTreeMap<(String, String), KeyPair>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<(String, String), KeyPair>>> {
        self.keys.lock().map_err(|_| Error::Lock("key store"))
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
impl KeyStore for InMemoryKeyStore {
    async fn set_key(&self, network_id: &str, account_id: &str, key: KeyPair) -> Result<()> {
        self.lock()?.insert((network_id.to_string(), account_id.to_string()), key);
        Ok(())
    }

    async fn get_key(&self, network_id: &str, account_id: &str) -> Result<Option<KeyPair>> {
        Ok(self.lock()?.get(&(network_id.to_string(), account_id.to_string())).cloned())
    }

    async fn remove_key(&self, network_id: &str, account_id: &str) -> Result<()> {
        self.lock()?.remove(&(network_id.to_string(), account_id.to_string()));
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    async fn get_networks(&self) -> Result<Vec<String>> {
        let mut networks: Vec<String> = self.lock()?.keys().map(|(n, _)| n.clone()).collect();
        networks.dedup();
        Ok(networks)
    }

    async fn get_accounts(&self, network_id: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()?
            .keys()
            .filter(|(n, _)| n == network_id)
            .map(|(_, a)| a.clone())
            .collect())
    }
}

#[cfg(feature = "native")]
pub use file::FileKeyStore;

#[cfg(feature = "native")]
mod file {
    use super::{KeyPair, KeyStore};
    use crate::error::{Error, Result};
    use serde::{Deserialize, Serialize};
    use std::path::{Path, PathBuf};

    #[derive(Debug, Serialize, Deserialize)]
    struct KeyFile {
        account_id: String,
        public_key: String,
        private_key: String,
    }

    /// One JSON file per account under `<root>/<network>/`.
    #[derive(Debug, Clone)]
    pub struct FileKeyStore {
        root: PathBuf,
    }

    impl FileKeyStore {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        pub fn root(&self) -> &Path {
            &self.root
        }

        fn key_path(&self, network_id: &str, account_id: &str) -> Result<PathBuf> {
            for part in [network_id, account_id] {
                if part.is_empty() || part.contains(['/', '\\']) || part == ".." {
                    return Err(Error::KeyStore(format!("invalid path component {part:?}")));
                }
            }
            Ok(self.root.join(network_id).join(format!("{account_id}.json")))
        }

        fn list_dir(path: &Path) -> Result<Vec<std::fs::DirEntry>> {
            match std::fs::read_dir(path) {
                Ok(entries) => Ok(entries.collect::<std::io::Result<Vec<_>>>()?),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
                Err(e) => Err(e.into()),
            }
        }
    }

    #[async_trait::async_trait]
    impl KeyStore for FileKeyStore {
        async fn set_key(&self, network_id: &str, account_id: &str, key: KeyPair) -> Result<()> {
            let path = self.key_path(network_id, account_id)?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = KeyFile {
                account_id: account_id.to_string(),
                public_key: key.public_key().to_string(),
                private_key: key.secret_key(),
            };
            std::fs::write(&path, serde_json::to_string_pretty(&file)?)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
            }
            Ok(())
        }

        async fn get_key(&self, network_id: &str, account_id: &str) -> Result<Option<KeyPair>> {
            let path = self.key_path(network_id, account_id)?;
            let raw = match std::fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let file: KeyFile = serde_json::from_str(&raw)?;
            Ok(Some(file.private_key.parse()?))
        }

        async fn remove_key(&self, network_id: &str, account_id: &str) -> Result<()> {
            let path = self.key_path(network_id, account_id)?;
            match std::fs::remove_file(&path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            }
        }

        async fn clear(&self) -> Result<()> {
            for network in self.get_networks().await? {
                std::fs::remove_dir_all(self.root.join(network))?;
            }
            Ok(())
        }

        async fn get_networks(&self) -> Result<Vec<String>> {
            let mut networks = Vec::new();
            for entry in Self::list_dir(&self.root)? {
                if entry.file_type()?.is_dir() {
                    networks.push(entry.file_name().to_string_lossy().into_owned());
                }
            }
            networks.sort();
            Ok(networks)
        }

        async fn get_accounts(&self, network_id: &str) -> Result<Vec<String>> {
            let mut accounts = Vec::new();
            for entry in Self::list_dir(&self.root.join(network_id))? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if let Some(account) = name.strip_suffix(".json") {
                    accounts.push(account.to_string());
                }
            }
            accounts.sort();
            Ok(accounts)
        }
    }
}
