//! Wallet Tests: the built-in NEAR library behind the bootstrap
//!
//! These tests verify:
//! 1. Connect checks `status` and rejects a node serving another chain
//! 2. Sign-in builds the wallet login URL and parks a pending access key
//! 3. Completing sign-in promotes the key and persists auth data
//! 4. Sign-out reverses it, and the file key store uses the near-cli layout

use async_trait::async_trait;
use nearlink::near::{
    FileKeyStore, InMemoryKeyStore, KeyStore, MemorySessionStore, NearLibrary, NearLibraryLoader,
    Redirect, RpcTransport, SessionStore, PENDING_ACCESS_KEY_PREFIX, SESSION_FILE,
};
use nearlink::{BootstrapConfig, ConnectionConfig, Error, KeyPair, KeyStoreKind, WalletBootstrap};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use url::Url;

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Runtime::new().expect("runtime").block_on(f)
}

/// Answers `status` with a fixed chain id and records every request.
struct MockRpc {
    chain_id: String,
    requests: Mutex<Vec<(String, Value)>>,
    reject: bool,
}

impl MockRpc {
    fn serving(chain_id: &str) -> Arc<Self> {
        Arc::new(Self { chain_id: chain_id.into(), requests: Mutex::new(Vec::new()), reject: false })
    }

    fn rejecting() -> Arc<Self> {
        Arc::new(Self { chain_id: String::new(), requests: Mutex::new(Vec::new()), reject: true })
    }
}

#[async_trait]
impl RpcTransport for MockRpc {
    async fn post_json(&self, url: &str, body: &Value) -> anyhow::Result<Value> {
        self.requests.lock().unwrap().push((url.to_string(), body.clone()));
        if self.reject {
            return Ok(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "error": {"code": -32000, "message": "Server error", "name": "INTERNAL_ERROR"}
            }));
        }
        Ok(json!({
            "jsonrpc": "2.0",
            "id": body["id"],
            "result": {
                "chain_id": self.chain_id,
                "protocol_version": 67,
                "version": {"version": "1.39.0", "build": "test"},
                "sync_info": {"latest_block_hash": "11111111111111111111111111111111", "latest_block_height": 170_000_000, "syncing": false}
            }
        }))
    }
}

#[derive(Default)]
struct RecordingRedirect {
    urls: Mutex<Vec<Url>>,
}

impl Redirect for RecordingRedirect {
    fn redirect(&self, url: &Url) -> nearlink::Result<()> {
        self.urls.lock().unwrap().push(url.clone());
        Ok(())
    }
}

struct Harness {
    bootstrap: WalletBootstrap,
    rpc: Arc<MockRpc>,
    redirect: Arc<RecordingRedirect>,
    keys: Arc<InMemoryKeyStore>,
    session: Arc<MemorySessionStore>,
}

fn harness_with(config: BootstrapConfig, rpc: Arc<MockRpc>) -> Harness {
    let redirect = Arc::new(RecordingRedirect::default());
    let keys = Arc::new(InMemoryKeyStore::new());
    let session = Arc::new(MemorySessionStore::new());
    let library = NearLibrary::new(rpc.clone())
        .with_redirect(redirect.clone())
        .with_key_store(keys.clone())
        .with_session(session.clone());
    let bootstrap = WalletBootstrap::new(config, Arc::new(NearLibraryLoader::new(library)));
    Harness { bootstrap, rpc, redirect, keys, session }
}

fn harness() -> Harness {
    let config = BootstrapConfig::default()
        .with_success_url("https://game.example/")
        .with_failure_url("https://game.example/failed");
    harness_with(config, MockRpc::serving("testnet"))
}

fn query(url: &Url) -> HashMap<String, String> {
    url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
}

#[test]
fn connect_checks_node_status() {
    let h = harness();
    block_on(h.bootstrap.initialize_connection()).expect("init");

    let requests = h.rpc.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (url, body) = &requests[0];
    assert_eq!(url, "https://rpc.testnet.near.org");
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["method"], "status");
}

#[test]
fn connect_rejects_chain_mismatch() {
    let h = harness_with(BootstrapConfig::default(), MockRpc::serving("mainnet"));
    let err = block_on(h.bootstrap.initialize_connection()).unwrap_err();
    assert!(matches!(err, Error::Connection(ref msg) if msg.contains("mainnet")));
    assert!(!h.bootstrap.is_initialized());
}

#[test]
fn connect_surfaces_rpc_errors() {
    let h = harness_with(BootstrapConfig::default(), MockRpc::rejecting());
    let err = block_on(h.bootstrap.initialize_connection()).unwrap_err();
    assert!(matches!(err, Error::Connection(ref msg) if msg.contains("INTERNAL_ERROR")));
}

#[test]
fn connect_rejects_invalid_endpoint() {
    let config = BootstrapConfig::new(ConnectionConfig::testnet().with_wallet_url("not a url"));
    let h = harness_with(config, MockRpc::serving("testnet"));
    let err = block_on(h.bootstrap.initialize_connection()).unwrap_err();
    assert!(matches!(err, Error::Connection(ref msg) if msg.contains("walletUrl")));
    assert!(h.rpc.requests.lock().unwrap().is_empty());
}

#[test]
fn injected_stores_replace_browser_key_store() {
    let h = harness();
    assert_eq!(BootstrapConfig::default().connection.key_store, KeyStoreKind::browser_local());

    block_on(async {
        h.bootstrap.initialize_connection().await.expect("init");
        h.bootstrap.request_sign_in().await.expect("sign in");
    });
    assert_eq!(block_on(h.keys.get_accounts("testnet")).expect("accounts").len(), 1);
}

#[test]
fn browser_key_store_without_injection_fails_natively() {
    let library = NearLibrary::new(MockRpc::serving("testnet"));
    let bootstrap = WalletBootstrap::new(BootstrapConfig::default(), Arc::new(NearLibraryLoader::new(library)));
    let err = block_on(bootstrap.initialize_connection()).unwrap_err();
    assert!(matches!(err, Error::Connection(ref msg) if msg.contains("not available")));
    assert!(!bootstrap.is_initialized());
}

#[test]
fn sign_in_builds_login_url_and_parks_pending_key() {
    let h = harness();
    let outcome = block_on(async {
        h.bootstrap.initialize_connection().await.expect("init");
        h.bootstrap.request_sign_in().await.expect("sign in")
    });

    let url = outcome.url.expect("url");
    let public_key = outcome.public_key.expect("public key");
    assert!(url.as_str().starts_with("https://wallet.testnet.near.org/login/?"));

    let params = query(&url);
    assert_eq!(params["contract_id"], "pbc2024.testnet");
    assert_eq!(params["public_key"], public_key.to_string());
    assert_eq!(params["success_url"], "https://game.example/");
    assert_eq!(params["failure_url"], "https://game.example/failed");
    assert!(!params.contains_key("methodNames"));

    assert_eq!(*h.redirect.urls.lock().unwrap(), vec![url]);

    let pending = format!("{PENDING_ACCESS_KEY_PREFIX}{public_key}");
    let key = block_on(h.keys.get_key("testnet", &pending)).expect("get").expect("pending key");
    assert_eq!(key.public_key(), public_key);

    let wallet = h.bootstrap.wallet().expect("wallet");
    assert!(!wallet.is_signed_in());
}

#[test]
fn sign_in_lists_method_names() {
    let config = BootstrapConfig::default().with_method_names(vec!["play".into(), "score".into()]);
    let h = harness_with(config, MockRpc::serving("testnet"));
    let outcome = block_on(async {
        h.bootstrap.initialize_connection().await.expect("init");
        h.bootstrap.request_sign_in().await.expect("sign in")
    });
    let url = outcome.url.expect("url");
    let methods: Vec<String> = url
        .query_pairs()
        .filter(|(k, _)| k == "methodNames")
        .map(|(_, v)| v.into_owned())
        .collect();
    assert_eq!(methods, vec!["play", "score"]);
}

#[test]
fn sign_in_rejects_empty_contract() {
    let h = harness_with(BootstrapConfig::default().with_contract_id(""), MockRpc::serving("testnet"));
    let err = block_on(async {
        h.bootstrap.initialize_connection().await.expect("init");
        h.bootstrap.request_sign_in().await.unwrap_err()
    });
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert!(h.redirect.urls.lock().unwrap().is_empty());
}

#[test]
fn complete_sign_in_promotes_pending_key() {
    let h = harness();
    let public_key = block_on(async {
        h.bootstrap.initialize_connection().await.expect("init");
        let outcome = h.bootstrap.request_sign_in().await.expect("sign in");
        let public_key = outcome.public_key.expect("public key");

        let wallet = h.bootstrap.wallet().expect("wallet");
        wallet
            .complete_sign_in("alice.testnet", &public_key, vec!["ed25519:other".into()])
            .await
            .expect("complete");
        assert!(wallet.is_signed_in());
        assert_eq!(wallet.account_id().as_deref(), Some("alice.testnet"));
        public_key
    });

    let key = block_on(h.keys.get_key("testnet", "alice.testnet")).expect("get").expect("key");
    assert_eq!(key.public_key(), public_key);
    let pending = format!("{PENDING_ACCESS_KEY_PREFIX}{public_key}");
    assert!(block_on(h.keys.get_key("testnet", &pending)).expect("get").is_none());

    let raw = h.session.get_item("pbc2024.testnet_wallet_auth_key").expect("get").expect("auth data");
    let auth: Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(auth["accountId"], "alice.testnet");
    assert_eq!(auth["allKeys"], json!(["ed25519:other", public_key.to_string()]));
}

#[test]
fn auth_data_survives_reconnect() {
    let h = harness();
    block_on(async {
        h.bootstrap.initialize_connection().await.expect("init");
        let public_key = h.bootstrap.request_sign_in().await.expect("sign in").public_key.expect("pk");
        let wallet = h.bootstrap.wallet().expect("wallet");
        wallet.complete_sign_in("alice.testnet", &public_key, Vec::new()).await.expect("complete");

        h.bootstrap.initialize_connection().await.expect("re-init");
    });
    let wallet = h.bootstrap.wallet().expect("wallet");
    assert!(wallet.is_signed_in());
    assert_eq!(wallet.account_id().as_deref(), Some("alice.testnet"));
}

#[test]
fn complete_sign_in_requires_pending_key() {
    let h = harness();
    let unknown = KeyPair::from_seed(&[9u8; 32]).public_key();
    let err = block_on(async {
        h.bootstrap.initialize_connection().await.expect("init");
        let wallet = h.bootstrap.wallet().expect("wallet");
        wallet.complete_sign_in("alice.testnet", &unknown, Vec::new()).await.unwrap_err()
    });
    assert!(matches!(err, Error::KeyStore(_)));
    assert!(!h.bootstrap.wallet().expect("wallet").is_signed_in());
}

#[test]
fn sign_out_forgets_account() {
    let h = harness();
    block_on(async {
        h.bootstrap.initialize_connection().await.expect("init");
        let public_key = h.bootstrap.request_sign_in().await.expect("sign in").public_key.expect("pk");
        let wallet = h.bootstrap.wallet().expect("wallet");
        wallet.complete_sign_in("alice.testnet", &public_key, Vec::new()).await.expect("complete");

        wallet.sign_out().await.expect("sign out");
        assert!(!wallet.is_signed_in());
        assert!(wallet.account_id().is_none());
    });
    assert!(block_on(h.keys.get_key("testnet", "alice.testnet")).expect("get").is_none());
    assert!(h.session.get_item("pbc2024.testnet_wallet_auth_key").expect("get").is_none());
}

#[test]
fn file_system_key_store_uses_credentials_layout() {
    let dir = TempDir::new().expect("tempdir");
    let config = BootstrapConfig::new(
        ConnectionConfig::testnet().with_key_store(KeyStoreKind::file_system(dir.path())),
    );
    let rpc = MockRpc::serving("testnet");
    let library = NearLibrary::new(rpc).with_redirect(Arc::new(RecordingRedirect::default()));
    let bootstrap = WalletBootstrap::new(config, Arc::new(NearLibraryLoader::new(library)));

    let public_key = block_on(async {
        bootstrap.initialize_connection().await.expect("init");
        let public_key = bootstrap.request_sign_in().await.expect("sign in").public_key.expect("pk");
        let wallet = bootstrap.wallet().expect("wallet");
        wallet.complete_sign_in("alice.testnet", &public_key, Vec::new()).await.expect("complete");
        public_key
    });

    let key_file = dir.path().join("testnet").join("alice.testnet.json");
    let stored: Value = serde_json::from_str(&std::fs::read_to_string(&key_file).expect("key file"))
        .expect("json");
    assert_eq!(stored["account_id"], "alice.testnet");
    assert_eq!(stored["public_key"], public_key.to_string());
    assert!(stored["private_key"].as_str().expect("secret").starts_with("ed25519:"));

    let session = std::fs::read_to_string(dir.path().join(SESSION_FILE)).expect("session file");
    assert!(session.contains("alice.testnet"));

    let store = FileKeyStore::new(dir.path());
    assert_eq!(block_on(store.get_accounts("testnet")).expect("accounts"), vec!["alice.testnet"]);
}

#[test]
fn native_loader_builds_and_loads() {
    let loader = NearLibraryLoader::native().expect("native loader");
    let bootstrap = WalletBootstrap::new(BootstrapConfig::default(), Arc::new(loader));
    block_on(bootstrap.start()).expect("start");
    assert!(bootstrap.is_library_loaded());
}
