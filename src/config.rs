//! Bootstrap configuration - injected by the caller, never hard-coded at the call site.
//!
//! `BootstrapConfig::default()` reproduces the testnet deployment the game page
//! was built against. Environment variables (`NEARLINK_*`) and JSON files can
//! override any field.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_LIBRARY_URL: &str =
    "https://cdn.jsdelivr.net/npm/near-api-js/dist/near-api-js.min.js";
pub const DEFAULT_CONTRACT_ID: &str = "pbc2024.testnet";
pub const BROWSER_KEYSTORE_PREFIX: &str = "near-api-js:keystore:";

/// Well-known NEAR deployments with endpoint presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "testnet" | "test" => Ok(Network::Testnet),
            "mainnet" | "main" => Ok(Network::Mainnet),
            _ => Err(Error::InvalidConfig(format!("unknown network {value:?}"))),
        }
    }
}

/// Credential-storage strategy handed to the wallet library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyStoreKind {
    InMemory,
    BrowserLocalStorage { prefix: String },
    FileSystem { root: PathBuf },
}

impl KeyStoreKind {
    pub fn browser_local() -> Self {
        KeyStoreKind::BrowserLocalStorage { prefix: BROWSER_KEYSTORE_PREFIX.to_string() }
    }

    pub fn file_system(root: impl Into<PathBuf>) -> Self {
        KeyStoreKind::FileSystem { root: root.into() }
    }

    /// `~/.near-credentials`, the layout near-cli uses.
    #[cfg(feature = "native")]
    pub fn default_file_system() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        KeyStoreKind::FileSystem { root: home.join(".near-credentials") }
    }
}

/// How to reach the wallet network. Cloned fresh for every connect call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub network_id: String,
    pub key_store: KeyStoreKind,
    pub node_url: String,
    pub wallet_url: String,
    pub helper_url: String,
    pub explorer_url: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::testnet()
    }
}

impl ConnectionConfig {
    pub fn testnet() -> Self {
        Self {
            network_id: "testnet".into(),
            key_store: KeyStoreKind::browser_local(),
            node_url: "https://rpc.testnet.near.org".into(),
            wallet_url: "https://wallet.testnet.near.org".into(),
            helper_url: "https://helper.testnet.near.org".into(),
            explorer_url: "https://explorer.testnet.near.org".into(),
        }
    }

    pub fn mainnet() -> Self {
        Self {
            network_id: "mainnet".into(),
            key_store: KeyStoreKind::browser_local(),
            node_url: "https://rpc.mainnet.near.org".into(),
            wallet_url: "https://app.mynearwallet.com".into(),
            helper_url: "https://helper.mainnet.near.org".into(),
            explorer_url: "https://explorer.mainnet.near.org".into(),
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Testnet => Self::testnet(),
            Network::Mainnet => Self::mainnet(),
        }
    }

    pub fn with_key_store(mut self, kind: KeyStoreKind) -> Self { self.key_store = kind; self }
    pub fn with_node_url(mut self, url: impl Into<String>) -> Self { self.node_url = url.into(); self }
    pub fn with_wallet_url(mut self, url: impl Into<String>) -> Self { self.wallet_url = url.into(); self }

    /// Network id must be non-empty and every endpoint must be an absolute URL.
    pub fn validate(&self) -> Result<()> {
        if self.network_id.trim().is_empty() {
            return Err(Error::InvalidConfig("networkId is empty".into()));
        }
        for (name, value) in [
            ("nodeUrl", &self.node_url),
            ("walletUrl", &self.wallet_url),
            ("helperUrl", &self.helper_url),
            ("explorerUrl", &self.explorer_url),
        ] {
            Url::parse(value)
                .map_err(|e| Error::InvalidConfig(format!("{name} {value:?}: {e}")))?;
        }
        Ok(())
    }
}

/// Everything the bootstrap needs: where the library lives, which contract
/// asks for authorization, and how to connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BootstrapConfig {
    pub library_url: String,
    pub contract_id: String,
    pub method_names: Vec<String>,
    pub success_url: Option<String>,
    pub failure_url: Option<String>,
    pub app_key_prefix: Option<String>,
    pub connection: ConnectionConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            library_url: DEFAULT_LIBRARY_URL.into(),
            contract_id: DEFAULT_CONTRACT_ID.into(),
            method_names: Vec::new(),
            success_url: None,
            failure_url: None,
            app_key_prefix: None,
            connection: ConnectionConfig::testnet(),
        }
    }
}

impl BootstrapConfig {
    pub fn new(connection: ConnectionConfig) -> Self {
        Self { connection, ..Default::default() }
    }
    pub fn with_library_url(mut self, url: impl Into<String>) -> Self { self.library_url = url.into(); self }
    pub fn with_contract_id(mut self, id: impl Into<String>) -> Self { self.contract_id = id.into(); self }
    pub fn with_method_names(mut self, names: Vec<String>) -> Self { self.method_names = names; self }
    pub fn with_success_url(mut self, url: impl Into<String>) -> Self { self.success_url = Some(url.into()); self }
    pub fn with_failure_url(mut self, url: impl Into<String>) -> Self { self.failure_url = Some(url.into()); self }
    pub fn with_app_key_prefix(mut self, prefix: impl Into<String>) -> Self { self.app_key_prefix = Some(prefix.into()); self }
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self { self.connection = connection; self }

    /// Prefix for the persisted auth data. Falls back to the contract id.
    pub fn app_key_prefix(&self) -> &str {
        match self.app_key_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => prefix,
            _ => &self.contract_id,
        }
    }

    pub fn sign_in_request(&self) -> crate::library::SignInRequest {
        crate::library::SignInRequest {
            contract_id: self.contract_id.clone(),
            method_names: self.method_names.clone(),
            success_url: self.success_url.clone(),
            failure_url: self.failure_url.clone(),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Defaults overlaid with `NEARLINK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().apply_env()
    }

    /// Swap the endpoint preset for `network`, keeping the key store.
    pub fn with_network(mut self, network: Network) -> Self {
        let key_store = self.connection.key_store.clone();
        self.connection = ConnectionConfig::for_network(network).with_key_store(key_store);
        if self.contract_id == DEFAULT_CONTRACT_ID && network != Network::Testnet {
            tracing::warn!(contract = %self.contract_id, network = network.as_str(), "default contract id targets testnet");
        }
        self
    }

    /// Overlay only the per-endpoint variables (`NEARLINK_{NODE,WALLET,HELPER,EXPLORER}_URL`).
    pub fn apply_endpoint_env(mut self) -> Self {
        if let Some(value) = env_var("NEARLINK_NODE_URL") { self.connection.node_url = value; }
        if let Some(value) = env_var("NEARLINK_WALLET_URL") { self.connection.wallet_url = value; }
        if let Some(value) = env_var("NEARLINK_HELPER_URL") { self.connection.helper_url = value; }
        if let Some(value) = env_var("NEARLINK_EXPLORER_URL") { self.connection.explorer_url = value; }
        self
    }

    /// Overlay `NEARLINK_*` environment variables.
    ///
    /// `NEARLINK_NETWORK` swaps the endpoint preset but keeps the key store;
    /// the per-endpoint variables are applied after it.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Some(value) = env_var("NEARLINK_NETWORK") {
            self = self.with_network(value.parse()?);
        }
        if let Some(value) = env_var("NEARLINK_LIBRARY_URL") { self.library_url = value; }
        if let Some(value) = env_var("NEARLINK_CONTRACT_ID") { self.contract_id = value; }
        if let Some(value) = env_var("NEARLINK_METHOD_NAMES") {
            self.method_names = value.split(',').map(str::trim).filter(|m| !m.is_empty()).map(String::from).collect();
        }
        if let Some(value) = env_var("NEARLINK_SUCCESS_URL") { self.success_url = Some(value); }
        if let Some(value) = env_var("NEARLINK_FAILURE_URL") { self.failure_url = Some(value); }
        if let Some(value) = env_var("NEARLINK_KEYSTORE_DIR") {
            self.connection.key_store = KeyStoreKind::file_system(value);
        }
        Ok(self.apply_endpoint_env())
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
