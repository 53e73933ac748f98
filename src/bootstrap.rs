//! WalletBootstrap - load the library once, connect, publish the wallet handle.
//!
//! ```text
//! empty ──ensure_library_loaded()──▶ loading ──ok──▶ loaded   (never replaced)
//!                                       └─────err──▶ empty    (next call retries)
//! absent ──initialize_connection()──▶ published ──▶ published'  (wallet slot, overwritten)
//! ```
//!
//! The in-flight load is a `Shared` future: every caller that arrives while it
//! runs awaits the same attempt and gets the same outcome, success or failure.

use crate::config::BootstrapConfig;
use crate::error::{Error, Result};
use crate::library::{LibraryLoader, SignInOutcome, WalletConnection, WalletLibrary};
use futures::future::{FutureExt, Shared};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Errors are carried as text so the outcome can be cloned to every waiter.
type LoadOutcome = std::result::Result<Arc<dyn WalletLibrary>, String>;

#[cfg(not(target_arch = "wasm32"))]
type LoadFuture = futures::future::BoxFuture<'static, LoadOutcome>;
#[cfg(target_arch = "wasm32")]
type LoadFuture = futures::future::LocalBoxFuture<'static, LoadOutcome>;

enum LibrarySlot {
    Empty,
    Loading(Shared<LoadFuture>),
    Loaded(Arc<dyn WalletLibrary>),
}

pub struct WalletBootstrap {
    config: BootstrapConfig,
    loader: Arc<dyn LibraryLoader>,
    library: Mutex<LibrarySlot>,
    wallet: RwLock<Option<Arc<dyn WalletConnection>>>,
}

impl WalletBootstrap {
    pub fn new(config: BootstrapConfig, loader: Arc<dyn LibraryLoader>) -> Self {
        Self {
            config,
            loader,
            library: Mutex::new(LibrarySlot::Empty),
            wallet: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Load the wallet library unless it is already cached.
    pub async fn ensure_library_loaded(&self) -> Result<Arc<dyn WalletLibrary>> {
        let attempt = {
            let mut slot = self.library.lock().map_err(|_| Error::Lock("library slot"))?;
            match &*slot {
                LibrarySlot::Loaded(library) => return Ok(library.clone()),
                LibrarySlot::Loading(attempt) => attempt.clone(),
                LibrarySlot::Empty => {
                    let attempt = self.begin_load();
                    *slot = LibrarySlot::Loading(attempt.clone());
                    attempt
                }
            }
        };

        let outcome = attempt.clone().await;
        {
            let mut slot = self.library.lock().map_err(|_| Error::Lock("library slot"))?;
            let current = matches!(&*slot, LibrarySlot::Loading(a) if a.ptr_eq(&attempt));
            if current {
                *slot = match &outcome {
                    Ok(library) => LibrarySlot::Loaded(library.clone()),
                    Err(_) => LibrarySlot::Empty,
                };
            }
        }
        outcome.map_err(Error::LibraryLoad)
    }

    fn begin_load(&self) -> Shared<LoadFuture> {
        let loader = self.loader.clone();
        let source = self.config.library_url.clone();
        info!(%source, "loading wallet library");
        let load: LoadFuture = Box::pin(async move {
            loader.load(&source).await.map_err(|e| {
                let message = match e.into_library_load() {
                    Error::LibraryLoad(message) => message,
                    other => other.to_string(),
                };
                warn!(%source, error = %message, "wallet library load failed");
                message
            })
        });
        load.shared()
    }

    /// Legacy "start game" trigger: loads the library and nothing else.
    pub async fn start(&self) -> Result<()> {
        self.ensure_library_loaded().await.map(|_| ())
    }

    /// Load, connect, build the wallet connection and publish it.
    ///
    /// Nothing is published unless every step succeeds.
    pub async fn initialize_connection(&self) -> Result<()> {
        let library = self.ensure_library_loaded().await?;
        let config = self.config.connection.clone();
        debug!(network = %config.network_id, node = %config.node_url, "connecting");

        let connection = library.connect(&config).await.map_err(|e| {
            let e = e.into_connection();
            warn!(network = %config.network_id, error = %e, "connect failed");
            e
        })?;
        let wallet = library
            .wallet_connection(connection, self.config.app_key_prefix())
            .map_err(Error::into_connection)?;

        self.publish(wallet)?;
        info!(network = %config.network_id, "wallet connection published");
        Ok(())
    }

    /// Ask the published wallet connection to authorize the configured contract.
    pub async fn request_sign_in(&self) -> Result<SignInOutcome> {
        let wallet = self.wallet()?;
        let request = self.config.sign_in_request();
        info!(contract = %request.contract_id, "requesting sign-in");
        wallet.request_sign_in(request).await
    }

    /// The published wallet connection, or `Error::Uninitialized`.
    pub fn wallet(&self) -> Result<Arc<dyn WalletConnection>> {
        let guard = self.wallet.read().map_err(|_| Error::Lock("wallet slot"))?;
        guard.clone().ok_or(Error::Uninitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.wallet.read().map(|g| g.is_some()).unwrap_or(false)
    }

    pub fn is_library_loaded(&self) -> bool {
        self.library
            .lock()
            .map(|slot| matches!(&*slot, LibrarySlot::Loaded(_)))
            .unwrap_or(false)
    }

    fn publish(&self, wallet: Arc<dyn WalletConnection>) -> Result<()> {
        let mut guard = self.wallet.write().map_err(|_| Error::Lock("wallet slot"))?;
        if guard.replace(wallet).is_some() {
            debug!("replaced previous wallet connection");
        }
        Ok(())
    }
}
