//! The seam between the bootstrap and whatever wallet-client library backs it.
//!
//! ```text
//! LibraryLoader ──load()──▶ WalletLibrary ──connect()──▶ Connection
//!                                │
//!                                └──wallet_connection()──▶ WalletConnection
//! ```
//!
//! Native builds back this with the Rust implementation in [`crate::near`];
//! browser builds back it with near-api-js loaded from the CDN.

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::near::PublicKey;
use std::any::Any;
use std::sync::Arc;
use url::Url;

/// `Send + Sync` on native targets, nothing on wasm32 where JS handles are
/// single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSendSync for T {}

/// What the page asks the wallet to authorize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRequest {
    pub contract_id: String,
    pub method_names: Vec<String>,
    pub success_url: Option<String>,
    pub failure_url: Option<String>,
}

/// Result of handing a sign-in request to the wallet. Libraries that redirect
/// on their own (near-api-js) leave both fields empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignInOutcome {
    pub url: Option<Url>,
    pub public_key: Option<PublicKey>,
}

/// Fetches the wallet-client library.
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
pub trait LibraryLoader: MaybeSendSync {
    async fn load(&self, source: &str) -> Result<Arc<dyn WalletLibrary>>;
}

/// A loaded wallet-client library.
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
pub trait WalletLibrary: MaybeSendSync {
    /// Open a network connection described by `config`.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Bind a wallet session to a connection produced by [`Self::connect`].
    fn wallet_connection(
        &self,
        connection: Arc<dyn Connection>,
        app_key_prefix: &str,
    ) -> Result<Arc<dyn WalletConnection>>;
}

/// Network connection object returned by a library's connect operation.
pub trait Connection: MaybeSendSync + std::fmt::Debug {
    fn config(&self) -> &ConnectionConfig;

    fn network_id(&self) -> &str {
        &self.config().network_id
    }

    /// Lets a library recover its own concrete connection type.
    fn as_any(&self) -> &dyn Any;
}

/// Session binding between the page and the user's wallet.
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
pub trait WalletConnection: MaybeSendSync {
    async fn request_sign_in(&self, request: SignInRequest) -> Result<SignInOutcome>;

    /// Finish a sign-in after the wallet redirected back with the account.
    async fn complete_sign_in(
        &self,
        _account_id: &str,
        _public_key: &PublicKey,
        _all_keys: Vec<String>,
    ) -> Result<()> {
        Err(Error::Unsupported("complete_sign_in"))
    }

    async fn sign_out(&self) -> Result<()>;

    fn is_signed_in(&self) -> bool;

    fn account_id(&self) -> Option<String>;
}
