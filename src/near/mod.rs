//! Rust-native NEAR wallet library.
//!
//! Implements the [`crate::library`] seam without any JavaScript:
//!
//! ```text
//! NearLibraryLoader ──▶ NearLibrary
//!                         ├── connect ──▶ Near (RpcClient `status` check, KeyStore, SessionStore)
//!                         └── wallet_connection ──▶ NearWalletConnection
//!                                                     ├── request_sign_in → pending key + login URL → Redirect
//!                                                     ├── complete_sign_in → pending key promoted, AuthData saved
//!                                                     └── sign_out
//! ```

mod connection;
mod keys;
mod keystore;
mod library;
mod redirect;
mod rpc;
mod session;
mod wallet;

pub use connection::Near;
pub use keys::{KeyPair, PublicKey, ED25519_PREFIX};
pub use keystore::{InMemoryKeyStore, KeyStore};
pub use library::{NearLibrary, NearLibraryLoader, SESSION_FILE};
pub use redirect::{LogRedirect, Redirect};
pub use rpc::{NodeStatus, NodeVersion, RpcClient, RpcError, RpcTransport, SyncInfo};
pub use session::{MemorySessionStore, SessionStore};
pub use wallet::{AuthData, NearWalletConnection, PENDING_ACCESS_KEY_PREFIX};

#[cfg(feature = "native")]
pub use keystore::FileKeyStore;
#[cfg(feature = "native")]
pub use rpc::ReqwestTransport;
#[cfg(feature = "native")]
pub use session::FileSessionStore;
