use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Bootstrap
    #[error("wallet library failed to load: {0}")]
    LibraryLoad(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("wallet connection not initialized, call initialize_connection first")]
    Uninitialized,

    // Validation
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid key: {0}")]
    Key(String),

    // Wallet
    #[error("key store: {0}")]
    KeyStore(String),
    #[error("redirect failed: {0}")]
    Redirect(String),
    #[error("{0} is not supported by this wallet library")]
    Unsupported(&'static str),
    #[error("{0} lock poisoned")]
    Lock(&'static str),

    // Wrapped external errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Re-tag any failure raised while loading the library.
    pub(crate) fn into_library_load(self) -> Self {
        match self {
            Error::LibraryLoad(_) => self,
            other => Error::LibraryLoad(other.to_string()),
        }
    }

    /// Re-tag any failure raised while connecting.
    pub(crate) fn into_connection(self) -> Self {
        match self {
            Error::Connection(_) => self,
            other => Error::Connection(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
