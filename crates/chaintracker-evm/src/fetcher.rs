//! EVM JSON-RPC `ChainFetcher` backed by `reqwest`.
//!
//! Uses `eth_blockNumber` for the chain tip and `eth_getBlockByNumber` (header
//! only) for historical hashes. Transport and node-side failures surface as
//! `RemoteUnavailable`; the tracker's poll loop owns retry and backoff, so no
//! retries happen here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use chaintracker_core::{ChainFetcher, EndpointDescriptor, TrackerError};

use crate::rpc::{parse_hex_i64, JsonRpcRequest, JsonRpcResponse};

/// Configuration for [`EvmChainFetcher`].
#[derive(Debug, Clone)]
pub struct EvmFetcherConfig {
    /// Chain identifier used in diagnostics (e.g. `"ethereum"`).
    pub chain_id: String,
    /// HTTP JSON-RPC endpoint URL.
    pub url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl EvmFetcherConfig {
    pub fn new(chain_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            url: url.into(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// `ChainFetcher` over an EVM JSON-RPC HTTP endpoint.
pub struct EvmChainFetcher {
    http: reqwest::Client,
    endpoint: EndpointDescriptor,
    req_id: AtomicU64,
}

impl EvmChainFetcher {
    pub fn new(config: EvmFetcherConfig) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TrackerError::RemoteUnavailable(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: EndpointDescriptor::new(config.chain_id, "jsonrpc", config.url),
            req_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TrackerError> {
        let req = JsonRpcRequest::new(self.req_id.fetch_add(1, Ordering::Relaxed), method, params);
        let resp = self
            .http
            .post(&self.endpoint.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| TrackerError::RemoteUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TrackerError::RemoteUnavailable(format!(
                "HTTP {status}: {body}"
            )));
        }

        let resp: JsonRpcResponse = resp
            .json()
            .await
            .map_err(|e| TrackerError::RemoteUnavailable(e.to_string()))?;
        resp.into_result()
            .map_err(|e| TrackerError::RemoteUnavailable(e.to_string()))
    }
}

#[async_trait]
impl ChainFetcher for EvmChainFetcher {
    async fn fetch_latest_block_number(&self) -> Result<i64, TrackerError> {
        let result = self.call("eth_blockNumber", vec![]).await?;
        let hex = result.as_str().ok_or_else(|| {
            TrackerError::RemoteUnavailable(format!("eth_blockNumber returned {result}"))
        })?;
        parse_hex_i64(hex).ok_or_else(|| {
            TrackerError::RemoteUnavailable(format!("unparseable block number {hex:?}"))
        })
    }

    async fn fetch_block_hash(&self, block_number: i64) -> Result<String, TrackerError> {
        let tag = format!("0x{block_number:x}");
        let result = self
            .call("eth_getBlockByNumber", vec![json!(tag), json!(false)])
            .await?;
        if result.is_null() {
            // The node pruned or never had this block.
            tracing::debug!(block = block_number, endpoint = %self.endpoint, "block not found on node");
            return Err(TrackerError::RemoteUnavailable(format!(
                "block {block_number} not found"
            )));
        }
        result["hash"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                TrackerError::RemoteUnavailable(format!(
                    "block {block_number} response carried no hash"
                ))
            })
    }

    fn endpoint(&self) -> &EndpointDescriptor {
        &self.endpoint
    }
}
