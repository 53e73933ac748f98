//! `Near` - the connection object produced by [`NearLibrary::connect`](super::NearLibrary).

use super::keystore::KeyStore;
use super::rpc::{NodeStatus, RpcClient};
use super::session::SessionStore;
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::library::Connection;
use std::any::Any;
use std::sync::Arc;

#[derive(Clone)]
pub struct Near {
    config: ConnectionConfig,
    rpc: RpcClient,
    key_store: Arc<dyn KeyStore>,
    session: Arc<dyn SessionStore>,
    status: NodeStatus,
}

impl Near {
    /// Validate `config`, then query node status and check it serves `network_id`.
    pub async fn connect(
        config: ConnectionConfig,
        rpc: RpcClient,
        key_store: Arc<dyn KeyStore>,
        session: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        config.validate().map_err(Error::into_connection)?;
        let status = rpc.status().await?;
        if status.chain_id != config.network_id {
            return Err(Error::Connection(format!(
                "node {} serves chain {:?}, expected {:?}",
                rpc.url(),
                status.chain_id,
                config.network_id
            )));
        }
        tracing::debug!(
            chain = %status.chain_id,
            height = status.sync_info.latest_block_height,
            version = %status.version.version,
            "node reachable"
        );
        Ok(Self { config, rpc, key_store, session, status })
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub fn key_store(&self) -> Arc<dyn KeyStore> {
        self.key_store.clone()
    }

    pub fn session(&self) -> Arc<dyn SessionStore> {
        self.session.clone()
    }

    /// Node status observed at connect time.
    pub fn status(&self) -> &NodeStatus {
        &self.status
    }
}

impl std::fmt::Debug for Near {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Near")
            .field("network_id", &self.config.network_id)
            .field("node_url", &self.config.node_url)
            .field("chain_id", &self.status.chain_id)
            .finish()
    }
}

impl Connection for Near {
    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
