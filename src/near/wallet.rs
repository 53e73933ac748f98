//! NearWalletConnection - sign-in through the NEAR web wallet.
//!
//! Sign-in generates a fresh access key and parks it in the key store as
//! `pending_key<public key>`. The user is then sent to `<wallet>/login/`.
//! When the wallet redirects back with `account_id`, the pending key is
//! promoted to that account and the auth data is saved under
//! `<app key prefix>_wallet_auth_key`.

use super::connection::Near;
use super::keys::{KeyPair, PublicKey};
use super::redirect::Redirect;
use crate::error::{Error, Result};
use crate::library::{Connection, SignInOutcome, SignInRequest, WalletConnection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};
use url::Url;

pub const PENDING_ACCESS_KEY_PREFIX: &str = "pending_key";
const LOGIN_PATH: &str = "login/";
const AUTH_DATA_SUFFIX: &str = "_wallet_auth_key";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub all_keys: Vec<String>,
}

pub struct NearWalletConnection {
    near: Near,
    auth_key: String,
    auth: RwLock<AuthData>,
    redirect: Arc<dyn Redirect>,
}

impl NearWalletConnection {
    /// Bind to `near`, restoring any auth data saved under `app_key_prefix`.
    pub fn new(near: Near, app_key_prefix: &str, redirect: Arc<dyn Redirect>) -> Result<Self> {
        let prefix = if app_key_prefix.is_empty() { "default" } else { app_key_prefix };
        let auth_key = format!("{prefix}{AUTH_DATA_SUFFIX}");
        let auth = match near.session().get_item(&auth_key)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => AuthData::default(),
        };
        Ok(Self { near, auth_key, auth: RwLock::new(auth), redirect })
    }

    pub fn near(&self) -> &Near {
        &self.near
    }

    pub fn auth_data(&self) -> AuthData {
        self.auth.read().map(|a| a.clone()).unwrap_or_default()
    }

    /// `<wallet_url>/login/?success_url=…&failure_url=…&contract_id=…&public_key=…&methodNames=…`
    pub fn login_url(&self, request: &SignInRequest, public_key: &PublicKey) -> Result<Url> {
        let mut base = self.near.config().wallet_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let mut url = Url::parse(&base)
            .and_then(|u| u.join(LOGIN_PATH))
            .map_err(|e| Error::InvalidConfig(format!("walletUrl {base:?}: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(success) = &request.success_url {
                query.append_pair("success_url", success);
            }
            if let Some(failure) = &request.failure_url {
                query.append_pair("failure_url", failure);
            }
            query.append_pair("contract_id", &request.contract_id);
            query.append_pair("public_key", &public_key.to_string());
            for method in &request.method_names {
                query.append_pair("methodNames", method);
            }
        }
        Ok(url)
    }

    fn save_auth(&self, auth: AuthData) -> Result<()> {
        let session = self.near.session();
        if auth.account_id.is_some() {
            session.set_item(&self.auth_key, &serde_json::to_string(&auth)?)?;
        } else {
            session.remove_item(&self.auth_key)?;
        }
        *self.auth.write().map_err(|_| Error::Lock("auth data"))? = auth;
        Ok(())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
impl WalletConnection for NearWalletConnection {
    async fn request_sign_in(&self, request: SignInRequest) -> Result<SignInOutcome> {
        if request.contract_id.trim().is_empty() {
            return Err(Error::InvalidConfig("contract id is empty".into()));
        }
        let key = KeyPair::generate();
        let public_key = key.public_key();
        let url = self.login_url(&request, &public_key)?;

        let pending = format!("{PENDING_ACCESS_KEY_PREFIX}{public_key}");
        self.near.key_store().set_key(self.near.network_id(), &pending, key).await?;
        debug!(%public_key, "stored pending access key");

        self.redirect.redirect(&url)?;
        Ok(SignInOutcome { url: Some(url), public_key: Some(public_key) })
    }

    async fn complete_sign_in(
        &self,
        account_id: &str,
        public_key: &PublicKey,
        all_keys: Vec<String>,
    ) -> Result<()> {
        let network_id = self.near.network_id();
        let key_store = self.near.key_store();
        let pending = format!("{PENDING_ACCESS_KEY_PREFIX}{public_key}");
        let key = key_store
            .get_key(network_id, &pending)
            .await?
            .ok_or_else(|| Error::KeyStore(format!("no pending access key {public_key}")))?;

        key_store.set_key(network_id, account_id, key).await?;
        key_store.remove_key(network_id, &pending).await?;

        let mut all_keys = all_keys;
        let key_text = public_key.to_string();
        if !all_keys.contains(&key_text) {
            all_keys.push(key_text);
        }
        self.save_auth(AuthData { account_id: Some(account_id.to_string()), all_keys })?;
        info!(account = %account_id, "signed in");
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        let previous = self.auth_data();
        self.save_auth(AuthData::default())?;
        if let Some(account_id) = previous.account_id {
            self.near.key_store().remove_key(self.near.network_id(), &account_id).await?;
            info!(account = %account_id, "signed out");
        }
        Ok(())
    }

    fn is_signed_in(&self) -> bool {
        self.auth.read().map(|a| a.account_id.is_some()).unwrap_or(false)
    }

    fn account_id(&self) -> Option<String> {
        self.auth.read().ok().and_then(|a| a.account_id.clone())
    }
}
