//! NEAR JSON-RPC over a pluggable HTTP transport.

use crate::error::{Error, Result};
use crate::library::MaybeSendSync;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Posts a JSON body and returns the decoded JSON response.
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
pub trait RpcTransport: MaybeSendSync {
    async fn post_json(&self, url: &str, body: &Value) -> anyhow::Result<Value>;
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rpc error {}: {}", self.code, self.message)?;
        if let Some(name) = &self.name {
            write!(f, " ({name})")?;
        }
        if let Some(data) = &self.data {
            write!(f, ": {data}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeVersion {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub build: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncInfo {
    #[serde(default)]
    pub latest_block_hash: String,
    #[serde(default)]
    pub latest_block_height: u64,
    #[serde(default)]
    pub syncing: bool,
}

/// Subset of the `status` response used to verify the target network.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeStatus {
    pub chain_id: String,
    #[serde(default)]
    pub protocol_version: u32,
    #[serde(default)]
    pub version: NodeVersion,
    #[serde(default)]
    pub sync_info: SyncInfo,
}

#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn RpcTransport>,
    url: String,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient").field("url", &self.url).finish()
    }
}

impl RpcClient {
    pub fn new(transport: Arc<dyn RpcTransport>, url: impl Into<String>) -> Self {
        Self { transport, url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = RpcRequest { jsonrpc: "2.0", id: "nearlink", method, params };
        let body = serde_json::to_value(&request)?;
        let raw = self
            .transport
            .post_json(&self.url, &body)
            .await
            .map_err(|e| Error::Connection(format!("{method} via {}: {e:#}", self.url)))?;
        let response: RpcResponse = serde_json::from_value(raw)
            .map_err(|e| Error::Connection(format!("{method}: malformed response: {e}")))?;
        match (response.result, response.error) {
            (_, Some(err)) => Err(Error::Connection(format!("{method}: {err}"))),
            (Some(result), None) => Ok(result),
            (None, None) => Err(Error::Connection(format!("{method}: empty response"))),
        }
    }

    pub async fn status(&self) -> Result<NodeStatus> {
        let result = self.call("status", json!([])).await?;
        serde_json::from_value(result)
            .map_err(|e| Error::Connection(format!("status: malformed result: {e}")))
    }
}

#[cfg(feature = "native")]
pub use native::ReqwestTransport;

#[cfg(feature = "native")]
mod native {
    use super::RpcTransport;
    use anyhow::Result;
    use reqwest::Client;
    use serde_json::Value;
    use std::time::Duration;

    #[derive(Clone, Debug)]
    pub struct ReqwestTransport {
        client: Client,
    }

    impl ReqwestTransport {
        /// Client with connect/request timeouts. Fails only if the TLS backend
        /// cannot be initialized.
        pub fn new() -> crate::error::Result<Self> {
            let client = Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(30))
                .build()
                .map_err(|e| crate::error::Error::Connection(format!("http client: {e}")))?;
            Ok(Self { client })
        }

        pub fn with_client(client: Client) -> Self {
            Self { client }
        }
    }

    #[async_trait::async_trait]
    impl RpcTransport for ReqwestTransport {
        async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
            let response = self
                .client
                .post(url)
                .json(body)
                .send()
                .await?
                .error_for_status()?;
            Ok(response.json().await?)
        }
    }

}
