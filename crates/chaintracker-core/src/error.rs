//! Error types for the chain tracker.

use thiserror::Error;

/// Errors that can occur while tracking a chain or querying the window.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The remote node could not be reached or returned a transport failure.
    /// Transient; the poll loop counts it and backs off.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The requested block is older than the remote's backward-lookup horizon.
    #[error("block {requested} is too old for the remote (latest: {latest}, memory: {server_block_memory})")]
    TooOldForRemote {
        requested: i64,
        latest: i64,
        server_block_memory: u64,
    },

    /// The caller asked for a range the window cannot satisfy.
    #[error("invalid range: {reason}")]
    InvalidRange { reason: String },

    /// The requested block is older than the oldest retained record.
    #[error("block {requested} is older than the retained history (earliest: {earliest})")]
    OutOfRetainedHistory { requested: i64, earliest: i64 },

    /// The window holds no blocks. Only possible before bootstrap completes.
    #[error("block window is empty")]
    EmptyWindow,

    /// The initial fetch could not populate the window after all retries.
    #[error("bootstrap failed after {retries} retries: {reason}")]
    BootstrapFailed { retries: usize, reason: String },

    /// The window and the backward scan disagree. Diagnostic; the scan treats
    /// the affected index as no-overlap and the window is left untouched.
    #[error("window inconsistency: {0}")]
    WindowInconsistency(String),

    /// A repair was requested with a latest block older than the tracked one.
    #[error("latest block moved backwards: provided {provided}, tracked {current}")]
    MonotonicityViolation { provided: i64, current: i64 },

    /// Configuration rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TrackerError {
    /// Returns `true` if the error is transient and worth retrying on the
    /// next poll tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_))
    }

    /// Returns `true` if the error indicates a caller-side bad request.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRange { .. } | Self::OutOfRetainedHistory { .. }
        )
    }
}
