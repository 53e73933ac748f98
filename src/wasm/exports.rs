//! JS-facing API.
//!
//! The free functions drive one page-wide bootstrap (default testnet config,
//! near-api-js, `window.walletConnection` mirror). `NearLink` is the same
//! thing with the config and engine chosen by the caller.

use super::fetch::FetchTransport;
use super::log;
use super::near_api::NearApiJsLoader;
use super::storage::LocationRedirect;
use crate::bootstrap::WalletBootstrap;
use crate::config::BootstrapConfig;
use crate::error::Error;
use crate::library::{LibraryLoader, SignInOutcome};
use crate::near::{NearLibrary, NearLibraryLoader, PublicKey};
use serde::Serialize;
use std::rc::Rc;
use std::sync::Arc;
use wasm_bindgen::prelude::*;

thread_local! {
    static PAGE: Rc<WalletBootstrap> = Rc::new(WalletBootstrap::new(
        BootstrapConfig::default(),
        Arc::new(NearApiJsLoader::new().with_global_mirror(true)),
    ));
}

fn page() -> Rc<WalletBootstrap> {
    PAGE.with(Rc::clone)
}

/// JS `Error` whose `name` tells the page which step failed.
fn to_js_error(err: Error) -> JsValue {
    let name = match &err {
        Error::LibraryLoad(_) => "LibraryLoadFailure",
        Error::Connection(_) => "ConnectionFailure",
        Error::Uninitialized => "UninitializedAccessError",
        Error::InvalidConfig(_) => "InvalidConfig",
        _ => "NearLinkError",
    };
    let js_err = js_sys::Error::new(&err.to_string());
    js_err.set_name(name);
    js_err.into()
}

/// Load near-api-js, connect to testnet and publish `window.walletConnection`.
#[wasm_bindgen(js_name = "initContract")]
pub async fn init_contract() -> Result<(), JsValue> {
    page().initialize_connection().await.map_err(to_js_error)
}

/// Send the user to the wallet to authorize the game contract.
#[wasm_bindgen(js_name = "signIn")]
pub async fn sign_in() -> Result<(), JsValue> {
    page().request_sign_in().await.map(|_| ()).map_err(to_js_error)
}

/// Start-game button: makes sure near-api-js is loaded.
#[wasm_bindgen(js_name = "startGame")]
pub async fn start_game() -> Result<(), JsValue> {
    page().start().await.map_err(to_js_error)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsSignInOutcome {
    url: Option<String>,
    public_key: Option<String>,
}

impl From<SignInOutcome> for JsSignInOutcome {
    fn from(outcome: SignInOutcome) -> Self {
        Self {
            url: outcome.url.map(String::from),
            public_key: outcome.public_key.map(|pk| pk.to_string()),
        }
    }
}

/// Wallet bootstrap with an injected config.
///
/// `engine` is `"near-api-js"` (default) or `"rust"`, the built-in library
/// over `fetch()` and `localStorage`.
#[wasm_bindgen]
pub struct NearLink {
    inner: Rc<WalletBootstrap>,
}

#[wasm_bindgen]
impl NearLink {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, engine: Option<String>) -> Result<NearLink, JsValue> {
        let config: BootstrapConfig = if config.is_undefined() || config.is_null() {
            BootstrapConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| to_js_error(Error::InvalidConfig(e.to_string())))?
        };

        let engine = engine.unwrap_or_else(|| "near-api-js".into());
        let loader: Arc<dyn LibraryLoader> = match engine.as_str() {
            "near-api-js" => Arc::new(NearApiJsLoader::new()),
            "rust" => {
                let library = NearLibrary::new(Arc::new(FetchTransport))
                    .with_redirect(Arc::new(LocationRedirect));
                Arc::new(NearLibraryLoader::new(library))
            }
            other => {
                return Err(to_js_error(Error::InvalidConfig(format!("unknown engine {other:?}"))));
            }
        };

        log!("[NearLink] {} on {}", engine, config.connection.network_id);
        Ok(Self { inner: Rc::new(WalletBootstrap::new(config, loader)) })
    }

    #[wasm_bindgen(js_name = "initializeConnection")]
    pub async fn initialize_connection(&self) -> Result<(), JsValue> {
        self.inner.initialize_connection().await.map_err(to_js_error)
    }

    /// Returns `{ url, publicKey }`; both are null with near-api-js, which
    /// navigates away on its own.
    #[wasm_bindgen(js_name = "requestSignIn")]
    pub async fn request_sign_in(&self) -> Result<JsValue, JsValue> {
        let outcome = self.inner.request_sign_in().await.map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&JsSignInOutcome::from(outcome))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Finish a sign-in from the wallet's redirect parameters
    /// (`account_id`, `public_key`, comma-separated `all_keys`).
    #[wasm_bindgen(js_name = "completeSignIn")]
    pub async fn complete_sign_in(
        &self,
        account_id: String,
        public_key: String,
        all_keys: Option<String>,
    ) -> Result<(), JsValue> {
        let public_key: PublicKey = public_key.parse().map_err(to_js_error)?;
        let all_keys = all_keys
            .map(|keys| keys.split(',').filter(|k| !k.is_empty()).map(String::from).collect())
            .unwrap_or_default();
        let wallet = self.inner.wallet().map_err(to_js_error)?;
        wallet
            .complete_sign_in(&account_id, &public_key, all_keys)
            .await
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = "signOut")]
    pub async fn sign_out(&self) -> Result<(), JsValue> {
        let wallet = self.inner.wallet().map_err(to_js_error)?;
        wallet.sign_out().await.map_err(to_js_error)
    }

    pub async fn start(&self) -> Result<(), JsValue> {
        self.inner.start().await.map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = "isInitialized")]
    pub fn is_initialized(&self) -> bool {
        self.inner.is_initialized()
    }

    #[wasm_bindgen(js_name = "isSignedIn")]
    pub fn is_signed_in(&self) -> bool {
        self.inner.wallet().map(|w| w.is_signed_in()).unwrap_or(false)
    }

    #[wasm_bindgen(js_name = "accountId")]
    pub fn account_id(&self) -> Option<String> {
        self.inner.wallet().ok().and_then(|w| w.account_id())
    }
}
