//! The `ChainFetcher` trait — the tracker's only view of the remote node.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Opaque description of the remote endpoint, attached to diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Chain identifier (e.g. `"ethereum"`).
    pub chain_id: String,
    /// API flavor spoken to the node (e.g. `"jsonrpc"`).
    pub api_interface: String,
    /// Node address.
    pub url: String,
}

impl EndpointDescriptor {
    pub fn new(
        chain_id: impl Into<String>,
        api_interface: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            api_interface: api_interface.into(),
            url: url.into(),
        }
    }
}

impl std::fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} @ {}", self.chain_id, self.api_interface, self.url)
    }
}

/// Capability to read the chain tip and resolve historical block hashes.
///
/// The fetcher is a shared collaborator; it must outlive the tracker and be
/// usable from the poll task and callers concurrently. Calls may block
/// arbitrarily long, so the tracker never holds its window lock across them.
/// Timeouts are the implementation's responsibility.
///
/// # Object Safety
/// The trait is object-safe and is held as `Arc<dyn ChainFetcher>`.
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    /// The latest block number the remote currently knows.
    async fn fetch_latest_block_number(&self) -> Result<i64, TrackerError>;

    /// The hash the remote associates with `block_number`.
    async fn fetch_block_hash(&self, block_number: i64) -> Result<String, TrackerError>;

    /// Endpoint description for diagnostics.
    fn endpoint(&self) -> &EndpointDescriptor;
}
