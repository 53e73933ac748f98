//! nearlink CLI - NEAR wallet sign-in from a terminal
//!
//! Every command prints one JSON document:
//!   nearlink config                  → effective BootstrapConfig
//!   nearlink status                  → node status (chain id, height)
//!   nearlink sign-in                 → {url, publicKey} to open in a browser
//!   nearlink complete --account-id <id> --public-key <pk>
//!                                    → finish sign-in after the wallet redirect
//!   nearlink sign-out                → forget the session and its key
//!   nearlink keys                    → accounts with stored keys
//!
//! Configuration precedence: --flags > NEARLINK_* env (.env loaded) > --config file > defaults.

use anyhow::{anyhow, Context, Result};
use nearlink::config::KeyStoreKind;
use nearlink::logging::init_logging;
use nearlink::near::{FileKeyStore, KeyStore, ReqwestTransport, RpcClient};
use nearlink::{BootstrapConfig, Network, NearLibraryLoader, PublicKey, WalletBootstrap};
use serde_json::{json, Value};
use std::env;
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::debug;

fn main() {
    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);
    init_logging();

    if opts.help {
        print_usage();
        return;
    }

    if opts.version {
        println!("nearlink {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        Some("config") => cmd_config(&opts),
        Some("status") => run(cmd_status(&opts)),
        Some("sign-in") | Some("signin") => run(cmd_sign_in(&opts)),
        Some("complete") => run(cmd_complete(&opts)),
        Some("sign-out") | Some("signout") => run(cmd_sign_out(&opts)),
        Some("keys") => run(cmd_keys(&opts)),
        Some(cmd) => Err(anyhow!("Unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    let pretty = opts.pretty || std::io::stdout().is_terminal();
    match result {
        Ok(output) => println!("{}", render(&output, pretty)),
        Err(e) => {
            eprintln!("{}", render(&json!({"error": format!("{e:#}")}), pretty));
            std::process::exit(1);
        }
    }
}

fn render(value: &Value, pretty: bool) -> String {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.unwrap_or_else(|_| value.to_string())
}

fn run<F: std::future::Future<Output = Result<Value>>>(fut: F) -> Result<Value> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create runtime")?;
    rt.block_on(fut)
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    // Config options
    config: Option<String>,
    network: Option<String>,
    contract: Option<String>,
    keystore: Option<String>,
    node_url: Option<String>,
    success_url: Option<String>,
    failure_url: Option<String>,
    // complete options
    account_id: Option<String>,
    public_key: Option<String>,
    all_keys: Vec<String>,
    // Output options
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        // Load .env file if present
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let value = value.trim().trim_matches('"');
                    if !value.is_empty() && env::var(key.trim()).is_err() {
                        env::set_var(key.trim(), value);
                    }
                }
            }
        }

        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut i = 0;

        while i < args.len() {
            let arg = &args[i];
            let value = args.get(i + 1).cloned();
            let mut take = |slot: &mut Option<String>| {
                if value.is_some() {
                    *slot = value.clone();
                    i += 1;
                }
            };
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--pretty" => opts.pretty = true,
                "--config" | "-c" => take(&mut opts.config),
                "--network" | "-n" => take(&mut opts.network),
                "--contract" => take(&mut opts.contract),
                "--keystore" | "-k" => take(&mut opts.keystore),
                "--node-url" => take(&mut opts.node_url),
                "--success-url" => take(&mut opts.success_url),
                "--failure-url" => take(&mut opts.failure_url),
                "--account-id" | "-a" => take(&mut opts.account_id),
                "--public-key" | "-p" => take(&mut opts.public_key),
                "--all-keys" => {
                    let mut keys = None;
                    take(&mut keys);
                    if let Some(keys) = keys {
                        opts.all_keys = keys
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect();
                    }
                }
                _ if !arg.starts_with('-') => positional.push(arg.clone()),
                _ => {} // Ignore unknown flags
            }
            i += 1;
        }

        // First positional is command
        if !positional.is_empty() {
            opts.command = Some(positional.remove(0));
        }

        if opts.config.is_none() {
            opts.config = env::var("NEARLINK_CONFIG").ok().filter(|s| !s.is_empty());
        }

        opts
    }

    /// File (or defaults) → `NEARLINK_*` env → flags.
    fn bootstrap_config(&self) -> Result<BootstrapConfig> {
        let mut config = match self.config.as_deref() {
            Some(path) => BootstrapConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path))?,
            None => BootstrapConfig::default(),
        };
        // localStorage means nothing here; fall back to ~/.near-credentials.
        if matches!(config.connection.key_store, KeyStoreKind::BrowserLocalStorage { .. }) {
            config.connection.key_store = KeyStoreKind::default_file_system();
        }
        let mut config = config.apply_env()?;

        // Endpoint env vars still beat the flag's preset; only --node-url beats them.
        if let Some(raw) = self.network.as_deref() {
            let network: Network = raw.parse().with_context(|| format!("Invalid network: {}", raw))?;
            config = config.with_network(network).apply_endpoint_env();
        }
        if let Some(contract) = &self.contract {
            config.contract_id = contract.clone();
        }
        if let Some(dir) = &self.keystore {
            config.connection.key_store = KeyStoreKind::file_system(dir);
        }
        if let Some(url) = &self.node_url {
            config.connection.node_url = url.clone();
        }
        if let Some(url) = &self.success_url {
            config.success_url = Some(url.clone());
        }
        if let Some(url) = &self.failure_url {
            config.failure_url = Some(url.clone());
        }

        config.connection.validate()?;
        debug!(network = %config.connection.network_id, contract = %config.contract_id, "config resolved");
        Ok(config)
    }
}

fn print_usage() {
    println!(
        r#"nearlink - NEAR wallet sign-in

USAGE:
    nearlink <command> [options]

COMMANDS:
    config                  Print the effective configuration
    status                  Query the RPC node (chain id, latest block)
    sign-in                 Generate an access key and print the wallet login URL
    complete                Finish sign-in with the wallet's redirect parameters
    sign-out                Clear the session and remove the account key
    keys                    List accounts with stored keys

CONFIG OPTIONS:
    --config, -c <file>     JSON config file (env: NEARLINK_CONFIG)
    --network, -n <net>     Network: testnet|mainnet (env: NEARLINK_NETWORK)
    --contract <id>         Contract to authorize (env: NEARLINK_CONTRACT_ID)
    --keystore, -k <dir>    Credentials directory (env: NEARLINK_KEYSTORE_DIR,
                            default: ~/.near-credentials)
    --node-url <url>        RPC endpoint (env: NEARLINK_NODE_URL)
    --success-url <url>     Wallet redirect on success
    --failure-url <url>     Wallet redirect on failure

COMPLETE OPTIONS:
    --account-id, -a <id>   account_id from the redirect
    --public-key, -p <pk>   public_key from the redirect
    --all-keys <k1,k2>      all_keys from the redirect

OUTPUT OPTIONS:
    --pretty                Pretty-print JSON
    --version, -V           Print version

EXAMPLES:
    nearlink sign-in --success-url http://localhost:8000/
    nearlink complete -a alice.testnet -p ed25519:8h7k...
    nearlink status --network mainnet | jq .chainId
"#
    );
}

fn bootstrap(config: BootstrapConfig) -> Result<WalletBootstrap> {
    Ok(WalletBootstrap::new(config, Arc::new(NearLibraryLoader::native()?)))
}

fn cmd_config(opts: &ParsedArgs) -> Result<Value> {
    Ok(serde_json::to_value(opts.bootstrap_config()?)?)
}

async fn cmd_status(opts: &ParsedArgs) -> Result<Value> {
    let config = opts.bootstrap_config()?;
    let rpc = RpcClient::new(Arc::new(ReqwestTransport::new()?), config.connection.node_url.clone());
    let status = rpc.status().await?;
    Ok(json!({
        "nodeUrl": rpc.url(),
        "networkId": config.connection.network_id,
        "chainId": status.chain_id,
        "protocolVersion": status.protocol_version,
        "version": status.version.version,
        "latestBlockHeight": status.sync_info.latest_block_height,
        "syncing": status.sync_info.syncing,
    }))
}

async fn cmd_sign_in(opts: &ParsedArgs) -> Result<Value> {
    let bootstrap = bootstrap(opts.bootstrap_config()?)?;
    bootstrap.initialize_connection().await?;
    let outcome = bootstrap.request_sign_in().await?;
    Ok(json!({
        "contractId": bootstrap.config().contract_id,
        "url": outcome.url.map(String::from),
        "publicKey": outcome.public_key.map(|pk| pk.to_string()),
    }))
}

async fn cmd_complete(opts: &ParsedArgs) -> Result<Value> {
    let account_id = opts.account_id.as_deref().ok_or_else(|| anyhow!("--account-id required"))?;
    let public_key: PublicKey = opts
        .public_key
        .as_deref()
        .ok_or_else(|| anyhow!("--public-key required"))?
        .parse()?;

    let bootstrap = bootstrap(opts.bootstrap_config()?)?;
    bootstrap.initialize_connection().await?;
    let wallet = bootstrap.wallet()?;
    wallet.complete_sign_in(account_id, &public_key, opts.all_keys.clone()).await?;
    Ok(json!({
        "accountId": wallet.account_id(),
        "signedIn": wallet.is_signed_in(),
    }))
}

async fn cmd_sign_out(opts: &ParsedArgs) -> Result<Value> {
    let bootstrap = bootstrap(opts.bootstrap_config()?)?;
    bootstrap.initialize_connection().await?;
    let wallet = bootstrap.wallet()?;
    let account_id = wallet.account_id();
    wallet.sign_out().await?;
    Ok(json!({"accountId": account_id, "signedIn": false}))
}

async fn cmd_keys(opts: &ParsedArgs) -> Result<Value> {
    let config = opts.bootstrap_config()?;
    let KeyStoreKind::FileSystem { root } = &config.connection.key_store else {
        return Err(anyhow!("keys needs a file system key store"));
    };
    let store = FileKeyStore::new(root.clone());
    let network = &config.connection.network_id;
    let mut accounts = Vec::new();
    for account in store.get_accounts(network).await? {
        let public_key = store.get_key(network, &account).await?.map(|k| k.public_key().to_string());
        accounts.push(json!({"accountId": account, "publicKey": public_key}));
    }
    Ok(json!({"networkId": network, "root": root, "accounts": accounts}))
}
