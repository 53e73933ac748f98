//! NearLibrary - the Rust-native wallet library and its loader.

use super::connection::Near;
use super::keystore::{InMemoryKeyStore, KeyStore};
use super::redirect::{LogRedirect, Redirect};
use super::rpc::{RpcClient, RpcTransport};
use super::session::{MemorySessionStore, SessionStore};
use super::wallet::NearWalletConnection;
use crate::config::{ConnectionConfig, KeyStoreKind};
use crate::error::{Error, Result};
use crate::library::{Connection, LibraryLoader, WalletConnection, WalletLibrary};
use std::sync::Arc;

/// Session file kept next to the per-network credential directories.
pub const SESSION_FILE: &str = "nearlink-session.json";

#[derive(Clone)]
pub struct NearLibrary {
    transport: Arc<dyn RpcTransport>,
    redirect: Arc<dyn Redirect>,
    key_store: Option<Arc<dyn KeyStore>>,
    session: Option<Arc<dyn SessionStore>>,
}

impl NearLibrary {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport, redirect: Arc::new(LogRedirect), key_store: None, session: None }
    }

    /// reqwest transport, logged redirect.
    #[cfg(feature = "native")]
    pub fn native() -> Result<Self> {
        Ok(Self::new(Arc::new(super::rpc::ReqwestTransport::new()?)))
    }

    pub fn with_redirect(mut self, redirect: Arc<dyn Redirect>) -> Self { self.redirect = redirect; self }

    /// Use `key_store` instead of building one from the config's strategy.
    pub fn with_key_store(mut self, key_store: Arc<dyn KeyStore>) -> Self { self.key_store = Some(key_store); self }

    /// Use `session` instead of building one from the config's strategy.
    pub fn with_session(mut self, session: Arc<dyn SessionStore>) -> Self { self.session = Some(session); self }

    /// Injected stores win; the config's strategy only fills what is missing.
    fn stores_for(&self, kind: &KeyStoreKind) -> Result<(Arc<dyn KeyStore>, Arc<dyn SessionStore>)> {
        if let (Some(key_store), Some(session)) = (&self.key_store, &self.session) {
            return Ok((key_store.clone(), session.clone()));
        }
        let (key_store, session) = default_stores(kind)?;
        Ok((
            self.key_store.clone().unwrap_or(key_store),
            self.session.clone().unwrap_or(session),
        ))
    }
}

fn default_stores(kind: &KeyStoreKind) -> Result<(Arc<dyn KeyStore>, Arc<dyn SessionStore>)> {
    match kind {
        KeyStoreKind::InMemory => Ok((
            Arc::new(InMemoryKeyStore::new()),
            Arc::new(MemorySessionStore::new()),
        )),
        #[cfg(feature = "native")]
        KeyStoreKind::FileSystem { root } => Ok((
            Arc::new(super::keystore::FileKeyStore::new(root.clone())),
            Arc::new(super::session::FileSessionStore::new(root.join(SESSION_FILE))),
        )),
        #[cfg(all(feature = "wasm", target_arch = "wasm32"))]
        KeyStoreKind::BrowserLocalStorage { prefix } => {
            let storage = crate::wasm::storage::LocalStorage::open(prefix)?;
            Ok((Arc::new(storage.clone()), Arc::new(storage)))
        }
        #[allow(unreachable_patterns)]
        other => Err(Error::InvalidConfig(format!(
            "key store {other:?} is not available on this platform"
        ))),
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
impl WalletLibrary for NearLibrary {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let (key_store, session) = self.stores_for(&config.key_store)?;
        let rpc = RpcClient::new(self.transport.clone(), config.node_url.clone());
        let near = Near::connect(config.clone(), rpc, key_store, session).await?;
        Ok(Arc::new(near))
    }

    fn wallet_connection(
        &self,
        connection: Arc<dyn Connection>,
        app_key_prefix: &str,
    ) -> Result<Arc<dyn WalletConnection>> {
        let near = connection
            .as_any()
            .downcast_ref::<Near>()
            .cloned()
            .ok_or_else(|| Error::Connection(format!("{connection:?} was not opened by NearLibrary")))?;
        let wallet = NearWalletConnection::new(near, app_key_prefix, self.redirect.clone())?;
        Ok(Arc::new(wallet))
    }
}

/// "Loads" the Rust-native library: nothing is fetched, the source URL is
/// only recorded.
#[derive(Clone)]
pub struct NearLibraryLoader {
    library: NearLibrary,
}

impl NearLibraryLoader {
    pub fn new(library: NearLibrary) -> Self {
        Self { library }
    }

    #[cfg(feature = "native")]
    pub fn native() -> Result<Self> {
        Ok(Self::new(NearLibrary::native()?))
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
impl LibraryLoader for NearLibraryLoader {
    async fn load(&self, source: &str) -> Result<Arc<dyn WalletLibrary>> {
        tracing::debug!(%source, "using built-in NEAR library");
        Ok(Arc::new(self.library.clone()))
    }
}
