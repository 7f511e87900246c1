//! Tracker configuration and validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Configuration for a [`ChainTracker`](crate::tracker::ChainTracker).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Window size: how many recent blocks to retain.
    pub blocks_to_save: u64,
    /// Expected time between blocks; the poll tick is a tenth of this.
    pub average_block_time: Duration,
    /// How far back the remote can resolve block hashes. Requests below
    /// `latest - server_block_memory` are rejected without calling the node.
    pub server_block_memory: u64,
    /// Emit a progress log whenever the latest block passes the previous
    /// checkpoint by this many blocks.
    pub block_checkpoint_distance: u64,
    /// Listen address for an external front-end re-exporting the window.
    /// Recognized and validated; serving itself is out of the tracker's hands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_address: Option<String>,
}

impl TrackerConfig {
    pub fn new(blocks_to_save: u64, average_block_time: Duration) -> Self {
        Self {
            blocks_to_save,
            average_block_time,
            server_block_memory: blocks_to_save * 2,
            block_checkpoint_distance: 100,
            server_address: None,
        }
    }

    /// Set the remote's backward-lookup horizon.
    pub fn server_block_memory(mut self, blocks: u64) -> Self {
        self.server_block_memory = blocks;
        self
    }

    /// Set the checkpoint logging distance.
    pub fn block_checkpoint_distance(mut self, distance: u64) -> Self {
        self.block_checkpoint_distance = distance;
        self
    }

    /// Set the front-end listen address.
    pub fn server_address(mut self, addr: impl Into<String>) -> Self {
        self.server_address = Some(addr.into());
        self
    }

    /// Reject configurations the tracker cannot run with.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.blocks_to_save == 0 {
            return Err(TrackerError::InvalidConfig(
                "blocks_to_save must be positive".into(),
            ));
        }
        if self.average_block_time.is_zero() {
            return Err(TrackerError::InvalidConfig(
                "average_block_time must be positive".into(),
            ));
        }
        if self.server_block_memory < self.blocks_to_save {
            return Err(TrackerError::InvalidConfig(format!(
                "server_block_memory {} is smaller than blocks_to_save {}",
                self.server_block_memory, self.blocks_to_save
            )));
        }
        if self.block_checkpoint_distance == 0 {
            return Err(TrackerError::InvalidConfig(
                "block_checkpoint_distance must be positive".into(),
            ));
        }
        if let Some(addr) = &self.server_address {
            if addr.is_empty() {
                return Err(TrackerError::InvalidConfig(
                    "server_address must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        // 128 blocks covers deep reorgs for all major EVM chains.
        Self::new(128, Duration::from_secs(12))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        TrackerConfig::default().validate().unwrap();
    }

    #[test]
    fn builder_style_overrides() {
        let config = TrackerConfig::new(64, Duration::from_secs(2))
            .server_block_memory(512)
            .block_checkpoint_distance(50)
            .server_address("127.0.0.1:7780");
        config.validate().unwrap();
        assert_eq!(config.server_block_memory, 512);
        assert_eq!(config.block_checkpoint_distance, 50);
        assert_eq!(config.server_address.as_deref(), Some("127.0.0.1:7780"));
    }

    #[test]
    fn zero_window_rejected() {
        let config = TrackerConfig::new(0, Duration::from_secs(12));
        assert!(matches!(
            config.validate(),
            Err(TrackerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_block_time_rejected() {
        let config = TrackerConfig::new(16, Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn short_server_memory_rejected() {
        let config = TrackerConfig::new(16, Duration::from_secs(12)).server_block_memory(8);
        assert!(config.validate().is_err());
    }
}
