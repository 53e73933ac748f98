//! Browser storage and navigation for the Rust-native wallet.
//!
//! Key layout matches near-api-js `BrowserLocalStorageKeyStore`
//! (`<prefix><account>:<network>` → `ed25519:<secret>`), so keys written by
//! either engine are visible to the other.

use crate::error::{Error, Result};
use crate::near::{KeyPair, KeyStore, Redirect, SessionStore};
use super::js;
use url::Url;
use web_sys::Storage;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    storage: Storage,
    prefix: String,
}

impl LocalStorage {
    pub fn open(prefix: &str) -> Result<Self> {
        let storage = web_sys::window()
            .ok_or_else(|| Error::KeyStore("no window".into()))?
            .local_storage()
            .map_err(|e| Error::KeyStore(js::describe(&e)))?
            .ok_or_else(|| Error::KeyStore("localStorage unavailable".into()))?;
        Ok(Self { storage, prefix: prefix.to_string() })
    }

    fn key_name(&self, network_id: &str, account_id: &str) -> String {
        format!("{}{}:{}", self.prefix, account_id, network_id)
    }

    /// `(account, network)` pairs owned by this prefix.
    fn entries(&self) -> Result<Vec<(String, String)>> {
        let len = self.storage.length().map_err(storage_err)?;
        let mut out = Vec::new();
        for i in 0..len {
            let Some(key) = self.storage.key(i).map_err(storage_err)? else { continue };
            if let Some(rest) = key.strip_prefix(&self.prefix) {
                if let Some((account, network)) = rest.rsplit_once(':') {
                    out.push((account.to_string(), network.to_string()));
                }
            }
        }
        Ok(out)
    }
}

fn storage_err(e: wasm_bindgen::JsValue) -> Error {
    Error::KeyStore(js::describe(&e))
}

#[async_trait::async_trait(?Send)]
impl KeyStore for LocalStorage {
    async fn set_key(&self, network_id: &str, account_id: &str, key: KeyPair) -> Result<()> {
        self.storage
            .set_item(&self.key_name(network_id, account_id), &key.secret_key())
            .map_err(storage_err)
    }

    async fn get_key(&self, network_id: &str, account_id: &str) -> Result<Option<KeyPair>> {
        match self.storage.get_item(&self.key_name(network_id, account_id)).map_err(storage_err)? {
            Some(secret) => Ok(Some(secret.parse()?)),
            None => Ok(None),
        }
    }

    async fn remove_key(&self, network_id: &str, account_id: &str) -> Result<()> {
        self.storage
            .remove_item(&self.key_name(network_id, account_id))
            .map_err(storage_err)
    }

    async fn clear(&self) -> Result<()> {
        for (account, network) in self.entries()? {
            self.storage
                .remove_item(&self.key_name(&network, &account))
                .map_err(storage_err)?;
        }
        Ok(())
    }

    async fn get_networks(&self) -> Result<Vec<String>> {
        let mut networks: Vec<String> = self.entries()?.into_iter().map(|(_, n)| n).collect();
        networks.sort();
        networks.dedup();
        Ok(networks)
    }

    async fn get_accounts(&self, network_id: &str) -> Result<Vec<String>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|(_, n)| n == network_id)
            .map(|(a, _)| a)
            .collect())
    }
}

/// Auth data goes straight into `localStorage`, without the key prefix.
impl SessionStore for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.storage.get_item(key).map_err(storage_err)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.storage.set_item(key, value).map_err(storage_err)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.storage.remove_item(key).map_err(storage_err)
    }
}

/// Sends the page to the wallet with `window.location.assign`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationRedirect;

impl Redirect for LocationRedirect {
    fn redirect(&self, url: &Url) -> Result<()> {
        let window = web_sys::window().ok_or_else(|| Error::Redirect("no window".into()))?;
        window
            .location()
            .assign(url.as_str())
            .map_err(|e| Error::Redirect(js::describe(&e)))
    }
}
