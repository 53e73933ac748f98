//! near-api-js behind the wallet-library seam.
//!
//! The CDN bundle is UMD: depending on how it is served, `import()` yields a
//! module namespace with `connect`, a namespace whose `default` holds the API,
//! or nothing useful while the bundle sets `window.nearApi`. All three are
//! accepted.

use super::js;
use super::log;
use crate::config::{ConnectionConfig, KeyStoreKind};
use crate::error::{Error, Result};
use crate::library::{Connection, LibraryLoader, SignInOutcome, SignInRequest, WalletConnection, WalletLibrary};
use js_sys::{Array, Object, Promise};
use std::any::Any;
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen(inline_js = "export function import_module(url) { return import(url); }")]
extern "C" {
    #[wasm_bindgen(catch)]
    fn import_module(url: &str) -> std::result::Result<Promise, JsValue>;
}

/// Imports near-api-js from the configured source URL.
#[derive(Debug, Clone, Default)]
pub struct NearApiJsLoader {
    mirror_global: bool,
}

impl NearApiJsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also publish each new wallet connection as `window.walletConnection`.
    pub fn with_global_mirror(mut self, mirror: bool) -> Self {
        self.mirror_global = mirror;
        self
    }
}

fn pick_api(module: &JsValue) -> Option<JsValue> {
    let has_connect = |v: &JsValue| js::get(v, "connect").map(|f| f.is_function()).unwrap_or(false);
    if has_connect(module) {
        return Some(module.clone());
    }
    if let Ok(default) = js::get(module, "default") {
        if has_connect(&default) {
            return Some(default);
        }
    }
    let window: JsValue = web_sys::window()?.into();
    js::get(&window, "nearApi").ok().filter(|api| has_connect(api))
}

#[async_trait::async_trait(?Send)]
impl LibraryLoader for NearApiJsLoader {
    async fn load(&self, source: &str) -> Result<Arc<dyn WalletLibrary>> {
        log!("[nearlink] importing {}", source);
        let promise = import_module(source).map_err(|e| Error::LibraryLoad(js::describe(&e)))?;
        let module = JsFuture::from(promise)
            .await
            .map_err(|e| Error::LibraryLoad(format!("{source}: {}", js::describe(&e))))?;
        let api = pick_api(&module)
            .ok_or_else(|| Error::LibraryLoad(format!("{source} did not provide connect()")))?;
        Ok(Arc::new(NearApiJs { api, mirror_global: self.mirror_global }))
    }
}

/// The loaded near-api-js namespace.
#[derive(Debug, Clone)]
pub struct NearApiJs {
    api: JsValue,
    mirror_global: bool,
}

impl NearApiJs {
    fn key_store(&self, kind: &KeyStoreKind) -> Result<JsValue> {
        let stores = js::get(&self.api, "keyStores").map_err(connection_err)?;
        match kind {
            KeyStoreKind::BrowserLocalStorage { prefix } => {
                let window = web_sys::window().ok_or_else(|| Error::Connection("no window".into()))?;
                let storage = window
                    .local_storage()
                    .map_err(connection_err)?
                    .ok_or_else(|| Error::Connection("localStorage unavailable".into()))?;
                let ctor = js::get(&stores, "BrowserLocalStorageKeyStore").map_err(connection_err)?;
                let storage: JsValue = storage.into();
                let args = Array::of2(&storage, &JsValue::from_str(prefix));
                js::construct(&ctor, &args).map_err(connection_err)
            }
            KeyStoreKind::InMemory => {
                let ctor = js::get(&stores, "InMemoryKeyStore").map_err(connection_err)?;
                js::construct(&ctor, &Array::new()).map_err(connection_err)
            }
            KeyStoreKind::FileSystem { .. } => Err(Error::InvalidConfig(
                "file system key store is not available in the browser".into(),
            )),
        }
    }
}

fn connection_err(e: JsValue) -> Error {
    Error::Connection(js::describe(&e))
}

#[async_trait::async_trait(?Send)]
impl WalletLibrary for NearApiJs {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let options: JsValue = Object::new().into();
        let key_store = self.key_store(&config.key_store)?;
        for (key, value) in [
            ("networkId", JsValue::from_str(&config.network_id)),
            ("keyStore", key_store),
            ("nodeUrl", JsValue::from_str(&config.node_url)),
            ("walletUrl", JsValue::from_str(&config.wallet_url)),
            ("helperUrl", JsValue::from_str(&config.helper_url)),
            ("explorerUrl", JsValue::from_str(&config.explorer_url)),
        ] {
            js::set(&options, key, &value).map_err(connection_err)?;
        }

        let pending = js::call(&self.api, "connect", &Array::of1(&options)).map_err(connection_err)?;
        let near = js::settle(pending).await.map_err(connection_err)?;
        Ok(Arc::new(JsConnection { config: config.clone(), near }))
    }

    fn wallet_connection(
        &self,
        connection: Arc<dyn Connection>,
        app_key_prefix: &str,
    ) -> Result<Arc<dyn WalletConnection>> {
        let near = connection
            .as_any()
            .downcast_ref::<JsConnection>()
            .map(|c| c.near.clone())
            .ok_or_else(|| Error::Connection(format!("{connection:?} was not opened by near-api-js")))?;

        let ctor = js::get(&self.api, "WalletConnection").map_err(connection_err)?;
        let args = Array::of2(&near, &JsValue::from_str(app_key_prefix));
        let inner = js::construct(&ctor, &args).map_err(connection_err)?;

        if self.mirror_global {
            if let Some(window) = web_sys::window() {
                let window: JsValue = window.into();
                js::set(&window, "walletConnection", &inner).map_err(connection_err)?;
            }
        }
        Ok(Arc::new(JsWalletConnection { inner }))
    }
}

/// The `Near` object returned by near-api-js `connect()`.
#[derive(Debug, Clone)]
pub struct JsConnection {
    config: ConnectionConfig,
    near: JsValue,
}

impl Connection for JsConnection {
    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// near-api-js `WalletConnection`; completes sign-in on its own when constructed
/// on the wallet's redirect back to the page.
#[derive(Debug, Clone)]
pub struct JsWalletConnection {
    inner: JsValue,
}

#[async_trait::async_trait(?Send)]
impl WalletConnection for JsWalletConnection {
    async fn request_sign_in(&self, request: SignInRequest) -> Result<SignInOutcome> {
        let options: JsValue = Object::new().into();
        let methods: Array = request.method_names.iter().map(|m| JsValue::from_str(m)).collect();
        let redirect_err = |e: JsValue| Error::Redirect(js::describe(&e));
        js::set(&options, "contractId", &JsValue::from_str(&request.contract_id)).map_err(redirect_err)?;
        js::set(&options, "methodNames", &methods).map_err(redirect_err)?;
        if let Some(url) = &request.success_url {
            js::set(&options, "successUrl", &JsValue::from_str(url)).map_err(redirect_err)?;
        }
        if let Some(url) = &request.failure_url {
            js::set(&options, "failureUrl", &JsValue::from_str(url)).map_err(redirect_err)?;
        }
        let pending = js::call(&self.inner, "requestSignIn", &Array::of1(&options)).map_err(redirect_err)?;
        js::settle(pending).await.map_err(redirect_err)?;
        Ok(SignInOutcome::default())
    }

    async fn sign_out(&self) -> Result<()> {
        let pending = js::call(&self.inner, "signOut", &Array::new()).map_err(connection_err)?;
        js::settle(pending).await.map_err(connection_err)?;
        Ok(())
    }

    fn is_signed_in(&self) -> bool {
        js::call(&self.inner, "isSignedIn", &Array::new())
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn account_id(&self) -> Option<String> {
        js::call(&self.inner, "getAccountId", &Array::new())
            .ok()
            .and_then(|v| v.as_string())
            .filter(|id| !id.is_empty())
    }
}
