//! nearlink: NEAR wallet bootstrap. Load the library once, connect, sign in.
//!
//! # Architecture
//!
//! ```text
//! WalletBootstrap (BootstrapConfig injected)
//!   │
//!   ├── ensure_library_loaded() ── LibraryLoader (memoized, one in-flight load)
//!   │                                 ├── NearLibraryLoader   (native, Rust JSON-RPC)
//!   │                                 └── NearApiJsLoader     (wasm, near-api-js from the CDN)
//!   │
//!   ├── initialize_connection() ── WalletLibrary::connect → wallet_connection → publish
//!   │
//!   └── request_sign_in() ──────── WalletConnection::request_sign_in(contract id)
//! ```
//!
//! # Features
//!
//! - `native` - tokio runtime, reqwest JSON-RPC, file key store, CLI
//! - `wasm` - browser bindings (`initContract`, `signIn`, `startGame`, `NearLink`)
//!
//! # Usage
//!
//! ```ignore
//! use nearlink::{BootstrapConfig, ConnectionConfig, KeyStoreKind, NearLibraryLoader, WalletBootstrap};
//! use std::sync::Arc;
//!
//! let config = BootstrapConfig::new(
//!     ConnectionConfig::testnet().with_key_store(KeyStoreKind::default_file_system()),
//! );
//! let bootstrap = WalletBootstrap::new(config, Arc::new(NearLibraryLoader::native()?));
//! bootstrap.initialize_connection().await?;
//! let outcome = bootstrap.request_sign_in().await?;
//! println!("{}", outcome.url.unwrap());
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod library;
pub mod near;

#[cfg(feature = "native")]
pub mod logging;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod wasm;

pub use bootstrap::WalletBootstrap;
pub use config::{BootstrapConfig, ConnectionConfig, KeyStoreKind, Network, DEFAULT_CONTRACT_ID, DEFAULT_LIBRARY_URL};
pub use error::{Error, Result};
pub use library::{Connection, LibraryLoader, SignInOutcome, SignInRequest, WalletConnection, WalletLibrary};
pub use near::{KeyPair, NearLibrary, NearLibraryLoader, PublicKey};

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub use wasm::{NearApiJsLoader, NearLink};
