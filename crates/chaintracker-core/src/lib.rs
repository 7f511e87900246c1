//! chaintracker-core — reorg-aware sliding-window block tracker.
//!
//! # Architecture
//!
//! ```text
//! ChainTracker::spawn → poll task
//!                           ├── ChainFetcher      (remote node capability)
//!                           ├── BlockWindow       (bounded contiguous records)
//!                           ├── overlap repair    (backward scan + splice)
//!                           ├── HandlerRegistry   (new-block / fork consumers)
//!                           └── exponential backoff on remote failures
//! readers ──────────────→ get_latest_block_data / latest_number
//! ```

pub mod backoff;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod handler;
pub mod query;
pub mod tracker;
pub mod types;
pub mod window;

pub use backoff::{exponential_backoff, BACKOFF_MAX};
pub use config::TrackerConfig;
pub use error::TrackerError;
pub use fetcher::{ChainFetcher, EndpointDescriptor};
pub use handler::{ForkFn, ForkHandler, HandlerRegistry, NewLatestFn, NewLatestHandler};
pub use query::WantedBlocks;
pub use tracker::ChainTracker;
pub use types::{BlockRecord, BlockSelector};
pub use window::BlockWindow;
