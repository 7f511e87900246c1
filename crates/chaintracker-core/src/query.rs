//! Range-query resolution — turns caller selectors into window offsets.
//!
//! A query names up to three blocks: a `from`/`to` range and one specific
//! block, each either absolute, latest-relative, or omitted. Resolution
//! happens against the latest and earliest tracked numbers at call time and
//! produces the concrete ascending window offsets to copy out.

use crate::error::TrackerError;
use crate::types::BlockSelector;

/// A validated, fully resolved query against the block window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WantedBlocks {
    /// Resolved inclusive range, present only when both endpoints were given.
    range: Option<(i64, i64)>,
    /// Resolved specific block, if requested.
    specific: Option<i64>,
    /// Oldest tracked number at resolution time; anchors window offsets.
    earliest: i64,
}

impl WantedBlocks {
    /// Resolve and validate a query.
    ///
    /// Omitting `from` or `to` drops the range and leaves only the specific
    /// block. Every resolved number must fall inside `[earliest, latest]`;
    /// numbers below `earliest` fail with `OutOfRetainedHistory`, everything
    /// else invalid fails with `InvalidRange`.
    pub fn new(
        from: BlockSelector,
        to: BlockSelector,
        specific: BlockSelector,
        latest: i64,
        earliest: i64,
    ) -> Result<Self, TrackerError> {
        let from = resolve(from, latest)?;
        let to = resolve(to, latest)?;
        let specific = resolve(specific, latest)?;

        let range = match (from, to) {
            (Some(from), Some(to)) => {
                if from > to {
                    return Err(TrackerError::InvalidRange {
                        reason: format!("from {from} is greater than to {to}"),
                    });
                }
                check_bounds(from, latest, earliest)?;
                check_bounds(to, latest, earliest)?;
                Some((from, to))
            }
            // A half-open request degenerates to the specific block only.
            _ => None,
        };
        if let Some(block) = specific {
            check_bounds(block, latest, earliest)?;
        }
        if range.is_none() && specific.is_none() {
            return Err(TrackerError::InvalidRange {
                reason: "no blocks requested".into(),
            });
        }
        Ok(Self {
            range,
            specific,
            earliest,
        })
    }

    /// Window offsets to copy, range ascending, the specific block appended
    /// when it is not already inside the range.
    pub fn iteration_indexes(&self) -> Vec<usize> {
        let mut indexes = Vec::new();
        if let Some((from, to)) = self.range {
            indexes.extend((from..=to).map(|n| (n - self.earliest) as usize));
        }
        if let Some(block) = self.specific {
            let in_range = self
                .range
                .map(|(from, to)| from <= block && block <= to)
                .unwrap_or(false);
            if !in_range {
                indexes.push((block - self.earliest) as usize);
            }
        }
        indexes
    }

    /// Sanity check that a record copied out actually belongs to the query.
    pub fn is_wanted(&self, block_number: i64) -> bool {
        let in_range = self
            .range
            .map(|(from, to)| from <= block_number && block_number <= to)
            .unwrap_or(false);
        in_range || self.specific == Some(block_number)
    }
}

fn resolve(selector: BlockSelector, latest: i64) -> Result<Option<i64>, TrackerError> {
    match selector {
        BlockSelector::NotApplicable => Ok(None),
        BlockSelector::Number(n) => {
            if n <= 0 {
                return Err(TrackerError::InvalidRange {
                    reason: format!("block number {n} is not positive"),
                });
            }
            Ok(Some(n))
        }
        BlockSelector::LatestMinus(d) => {
            if d < 0 {
                return Err(TrackerError::InvalidRange {
                    reason: format!("negative latest offset {d}"),
                });
            }
            Ok(Some(latest - d))
        }
    }
}

fn check_bounds(block: i64, latest: i64, earliest: i64) -> Result<(), TrackerError> {
    if block < earliest {
        return Err(TrackerError::OutOfRetainedHistory {
            requested: block,
            earliest,
        });
    }
    if block > latest {
        return Err(TrackerError::InvalidRange {
            reason: format!("block {block} is newer than latest {latest}"),
        });
    }
    Ok(())
}
