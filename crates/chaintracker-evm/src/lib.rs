//! chaintracker-evm — `ChainFetcher` implementation for EVM JSON-RPC nodes.

pub mod fetcher;
pub mod rpc;

pub use fetcher::{EvmChainFetcher, EvmFetcherConfig};
pub use rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
