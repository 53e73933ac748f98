//! Bootstrap Tests: library memoization, connection publishing, sign-in gating
//!
//! These tests verify:
//! 1. Concurrent and repeated loads fetch the library once, success or failure
//! 2. Failures leave the wallet handle absent and are retried
//! 3. Re-initialization overwrites the published handle
//! 4. Sign-in is refused before initialization and targets the configured contract

use async_trait::async_trait;
use nearlink::{
    BootstrapConfig, Connection, ConnectionConfig, Error, LibraryLoader, Result, SignInOutcome,
    SignInRequest, WalletBootstrap, WalletConnection, WalletLibrary, DEFAULT_CONTRACT_ID,
    DEFAULT_LIBRARY_URL,
};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Runtime::new().expect("runtime").block_on(f)
}

/// Shared record of everything the mocks were asked to do.
#[derive(Default)]
struct Recorder {
    loads: AtomicUsize,
    load_failures: AtomicUsize,
    connects: AtomicUsize,
    connect_failures: AtomicUsize,
    sources: Mutex<Vec<String>>,
    configs: Mutex<Vec<ConnectionConfig>>,
    sign_ins: Mutex<Vec<SignInRequest>>,
}

impl Recorder {
    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

struct MockLoader {
    calls: Arc<Recorder>,
}

#[async_trait]
impl LibraryLoader for MockLoader {
    async fn load(&self, source: &str) -> Result<Arc<dyn WalletLibrary>> {
        self.calls.loads.fetch_add(1, Ordering::SeqCst);
        self.calls.sources.lock().unwrap().push(source.to_string());
        // Let concurrent callers pile up on the in-flight load.
        tokio::task::yield_now().await;
        if self.calls.load_failures.load(Ordering::SeqCst) > 0 {
            self.calls.load_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::Io(std::io::Error::other("network unreachable")));
        }
        Ok(Arc::new(MockLibrary { calls: self.calls.clone() }))
    }
}

struct MockLibrary {
    calls: Arc<Recorder>,
}

#[derive(Debug)]
struct MockConnection {
    config: ConnectionConfig,
}

impl Connection for MockConnection {
    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl WalletLibrary for MockLibrary {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        self.calls.configs.lock().unwrap().push(config.clone());
        if self.calls.connect_failures.load(Ordering::SeqCst) > 0 {
            self.calls.connect_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::KeyStore("key store locked".into()));
        }
        Ok(Arc::new(MockConnection { config: config.clone() }))
    }

    fn wallet_connection(
        &self,
        connection: Arc<dyn Connection>,
        _app_key_prefix: &str,
    ) -> Result<Arc<dyn WalletConnection>> {
        let n = self.calls.connects.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(MockWallet {
            calls: self.calls.clone(),
            account_id: format!("wallet-{n}@{}", connection.network_id()),
        }))
    }
}

struct MockWallet {
    calls: Arc<Recorder>,
    account_id: String,
}

#[async_trait]
impl WalletConnection for MockWallet {
    async fn request_sign_in(&self, request: SignInRequest) -> Result<SignInOutcome> {
        self.calls.sign_ins.lock().unwrap().push(request);
        Ok(SignInOutcome::default())
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }

    fn is_signed_in(&self) -> bool {
        true
    }

    fn account_id(&self) -> Option<String> {
        Some(self.account_id.clone())
    }
}

fn setup(config: BootstrapConfig) -> (WalletBootstrap, Arc<Recorder>) {
    let calls = Arc::new(Recorder::default());
    let loader = Arc::new(MockLoader { calls: calls.clone() });
    (WalletBootstrap::new(config, loader), calls)
}

#[test]
fn concurrent_loads_share_one_fetch() {
    let (bootstrap, calls) = setup(BootstrapConfig::default());
    block_on(async {
        let (a, b, c) = tokio::join!(
            bootstrap.ensure_library_loaded(),
            bootstrap.ensure_library_loaded(),
            bootstrap.start(),
        );
        let (a, b) = (a.expect("load a"), b.expect("load b"));
        c.expect("start");
        assert!(Arc::ptr_eq(&a, &b));
    });
    assert_eq!(calls.loads(), 1);
    assert_eq!(*calls.sources.lock().unwrap(), vec![DEFAULT_LIBRARY_URL.to_string()]);
}

#[test]
fn concurrent_callers_share_one_failed_load() {
    let (bootstrap, calls) = setup(BootstrapConfig::default());
    calls.load_failures.store(1, Ordering::SeqCst);

    block_on(async {
        let (a, b, c) = tokio::join!(
            bootstrap.initialize_connection(),
            bootstrap.initialize_connection(),
            bootstrap.start(),
        );
        for result in [a, b, c] {
            let err = result.unwrap_err();
            assert!(matches!(err, Error::LibraryLoad(ref msg) if msg.contains("network unreachable")));
        }
        assert_eq!(calls.loads(), 1);
        assert!(!bootstrap.is_library_loaded());
        assert!(!bootstrap.is_initialized());

        // The failed attempt is not cached; the next caller loads again.
        bootstrap.initialize_connection().await.expect("retry");
    });
    assert_eq!(calls.loads(), 2);
    assert_eq!(calls.connects(), 1);
}

#[test]
fn loaded_library_is_reused() {
    let (bootstrap, calls) = setup(BootstrapConfig::default());
    block_on(async {
        assert!(!bootstrap.is_library_loaded());
        bootstrap.ensure_library_loaded().await.expect("first");
        bootstrap.initialize_connection().await.expect("init");
        bootstrap.initialize_connection().await.expect("re-init");
        bootstrap.start().await.expect("start");
    });
    assert!(bootstrap.is_library_loaded());
    assert_eq!(calls.loads(), 1);
}

#[test]
fn wallet_access_before_init_is_uninitialized() {
    let (bootstrap, calls) = setup(BootstrapConfig::default());
    assert!(matches!(bootstrap.wallet(), Err(Error::Uninitialized)));
    assert!(!bootstrap.is_initialized());

    let result = block_on(bootstrap.request_sign_in());
    assert!(matches!(result, Err(Error::Uninitialized)));
    assert_eq!(calls.loads(), 0);
    assert!(calls.sign_ins.lock().unwrap().is_empty());
}

#[test]
fn load_failure_is_reported_and_retried() {
    let (bootstrap, calls) = setup(BootstrapConfig::default());
    calls.load_failures.store(1, Ordering::SeqCst);

    block_on(async {
        let err = bootstrap.initialize_connection().await.unwrap_err();
        assert!(matches!(err, Error::LibraryLoad(ref msg) if msg.contains("network unreachable")));
        assert!(!bootstrap.is_library_loaded());
        assert!(matches!(bootstrap.wallet(), Err(Error::Uninitialized)));

        bootstrap.initialize_connection().await.expect("retry");
    });
    assert_eq!(calls.loads(), 2);
    assert!(bootstrap.is_initialized());
}

#[test]
fn connect_failure_keeps_previous_handle() {
    let (bootstrap, calls) = setup(BootstrapConfig::default());
    block_on(async {
        calls.connect_failures.store(1, Ordering::SeqCst);
        let err = bootstrap.initialize_connection().await.unwrap_err();
        assert!(matches!(err, Error::Connection(ref msg) if msg.contains("key store locked")));
        assert!(!bootstrap.is_initialized());

        bootstrap.initialize_connection().await.expect("init");
        calls.connect_failures.store(1, Ordering::SeqCst);
        assert!(bootstrap.initialize_connection().await.is_err());
    });
    let wallet = bootstrap.wallet().expect("wallet");
    assert_eq!(wallet.account_id().as_deref(), Some("wallet-1@testnet"));
}

#[test]
fn reinitialize_overwrites_handle() {
    let (bootstrap, _calls) = setup(BootstrapConfig::default());
    block_on(async {
        bootstrap.initialize_connection().await.expect("first");
        let first = bootstrap.wallet().expect("wallet");
        bootstrap.initialize_connection().await.expect("second");
        let second = bootstrap.wallet().expect("wallet");

        assert_eq!(first.account_id().as_deref(), Some("wallet-1@testnet"));
        assert_eq!(second.account_id().as_deref(), Some("wallet-2@testnet"));
        assert!(!Arc::ptr_eq(&first, &second));
    });
}

#[test]
fn connect_receives_configured_values_every_time() {
    let connection = ConnectionConfig::mainnet().with_node_url("https://rpc.example.org");
    let (bootstrap, calls) = setup(BootstrapConfig::new(connection.clone()));
    block_on(async {
        bootstrap.initialize_connection().await.expect("first");
        bootstrap.initialize_connection().await.expect("second");
    });
    let configs = calls.configs.lock().unwrap();
    assert_eq!(configs.len(), 2);
    assert!(configs.iter().all(|c| *c == connection));
}

#[test]
fn testnet_defaults_match_deployment() {
    let (bootstrap, calls) = setup(BootstrapConfig::default());
    block_on(bootstrap.initialize_connection()).expect("init");

    let configs = calls.configs.lock().unwrap();
    let config = &configs[0];
    assert_eq!(config.network_id, "testnet");
    assert_eq!(config.node_url, "https://rpc.testnet.near.org");
    assert_eq!(config.wallet_url, "https://wallet.testnet.near.org");
    assert_eq!(config.helper_url, "https://helper.testnet.near.org");
    assert_eq!(config.explorer_url, "https://explorer.testnet.near.org");
}

#[test]
fn sign_in_targets_configured_contract() {
    let (bootstrap, calls) = setup(BootstrapConfig::default());
    block_on(async {
        bootstrap.initialize_connection().await.expect("init");
        bootstrap.request_sign_in().await.expect("sign in");
    });
    let requests = calls.sign_ins.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].contract_id, DEFAULT_CONTRACT_ID);
    assert_eq!(requests[0].contract_id, "pbc2024.testnet");
    assert!(requests[0].method_names.is_empty());
}

#[test]
fn sign_in_uses_overridden_contract() {
    let config = BootstrapConfig::default()
        .with_contract_id("game.testnet")
        .with_method_names(vec!["play".into()])
        .with_success_url("https://game.example/ok");
    let (bootstrap, calls) = setup(config);
    block_on(async {
        bootstrap.initialize_connection().await.expect("init");
        bootstrap.request_sign_in().await.expect("sign in");
    });
    let requests = calls.sign_ins.lock().unwrap();
    assert_eq!(requests[0].contract_id, "game.testnet");
    assert_eq!(requests[0].method_names, vec!["play".to_string()]);
    assert_eq!(requests[0].success_url.as_deref(), Some("https://game.example/ok"));
}

#[test]
fn start_only_loads_library() {
    let (bootstrap, calls) = setup(BootstrapConfig::default());
    block_on(bootstrap.start()).expect("start");

    assert_eq!(calls.loads(), 1);
    assert_eq!(calls.connects(), 0);
    assert!(calls.configs.lock().unwrap().is_empty());
    assert!(!bootstrap.is_initialized());
}

#[test]
fn wallet_handle_sees_connection_network() {
    let (bootstrap, _calls) = setup(BootstrapConfig::new(ConnectionConfig::mainnet()));
    block_on(bootstrap.initialize_connection()).expect("init");
    let wallet = bootstrap.wallet().expect("wallet");
    assert_eq!(wallet.account_id().as_deref(), Some("wallet-1@mainnet"));
}
