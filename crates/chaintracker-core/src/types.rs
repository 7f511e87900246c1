//! Shared types for the tracking pipeline.

use serde::{Deserialize, Serialize};

// ─── BlockRecord ──────────────────────────────────────────────────────────────

/// A single tracked block: its number and the hash the remote reported for it.
///
/// The hash is an opaque identifier; the tracker compares it only for
/// equality and never interprets its contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Block number.
    pub block_number: i64,
    /// Block hash as reported by the remote at the time of the last repair.
    pub hash: String,
}

impl BlockRecord {
    pub fn new(block_number: i64, hash: impl Into<String>) -> Self {
        Self {
            block_number,
            hash: hash.into(),
        }
    }

    /// Returns `true` if `next` is the direct successor of `self` by number.
    pub fn precedes(&self, next: &BlockRecord) -> bool {
        next.block_number == self.block_number + 1
    }
}

// ─── BlockSelector ────────────────────────────────────────────────────────────

/// How a caller names a block in a range query.
///
/// `Number` is an absolute positive block number. `LatestMinus(d)` resolves to
/// the tracked latest minus `d` at query time. `NotApplicable` omits the
/// endpoint entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockSelector {
    Number(i64),
    LatestMinus(i64),
    NotApplicable,
}

impl BlockSelector {
    /// The newest tracked block (`LatestMinus(0)`).
    pub const LATEST: BlockSelector = BlockSelector::LatestMinus(0);

    /// Returns `true` if this selector names a block at all.
    pub fn is_applicable(&self) -> bool {
        !matches!(self, Self::NotApplicable)
    }
}

impl std::fmt::Display for BlockSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::LatestMinus(d) => write!(f, "latest-{d}"),
            Self::NotApplicable => write!(f, "n/a"),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_precedes_successor() {
        let a = BlockRecord::new(100, "h100");
        let b = BlockRecord::new(101, "h101");
        assert!(a.precedes(&b));
        assert!(!b.precedes(&a));
    }

    #[test]
    fn record_precedes_false_on_gap() {
        let a = BlockRecord::new(100, "h100");
        let c = BlockRecord::new(102, "h102");
        assert!(!a.precedes(&c));
    }

    #[test]
    fn selector_applicability() {
        assert!(BlockSelector::Number(5).is_applicable());
        assert!(BlockSelector::LATEST.is_applicable());
        assert!(!BlockSelector::NotApplicable.is_applicable());
    }

    #[test]
    fn selector_display() {
        assert_eq!(BlockSelector::Number(7).to_string(), "7");
        assert_eq!(BlockSelector::LatestMinus(2).to_string(), "latest-2");
        assert_eq!(BlockSelector::NotApplicable.to_string(), "n/a");
    }
}
