//! Block window — the bounded contiguous sequence of recent block headers.
//!
//! The window is pure data. The poll task rewrites it through
//! [`BlockWindow::replace_or_splice`] under an exclusive lock; readers take a
//! shared lock and copy records out. Invariants after bootstrap:
//!
//! - length equals the configured window size,
//! - block numbers are strictly contiguous ascending,
//! - readers never observe a partial update.

use crate::error::TrackerError;
use crate::types::BlockRecord;

/// Hash returned by [`BlockWindow::latest`] while the window is still empty.
/// A hash comparison against it reliably reports a mismatch, which is exactly
/// what the first fork check needs before bootstrap has filled the window.
pub const EMPTY_WINDOW_HASH: &str = "BAD-HASH";

/// Outcome of a successful overlap probe: how the existing window and the
/// freshly scanned tail are combined into the next window.
///
/// The next window is `existing[keep_from..keep_until]` followed by the
/// conceptual new queue from `tail_from` onward. `tail_from` is always
/// positive; a zero value would mean nothing was kept, which the probe
/// reports as no-overlap instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpliceBounds {
    pub keep_from: i64,
    pub keep_until: i64,
    pub tail_from: i64,
}

impl SpliceBounds {
    /// Number of existing records this splice retains.
    pub fn kept(&self) -> i64 {
        self.keep_until - self.keep_from
    }
}

/// The ordered sequence of recently observed blocks, oldest first.
#[derive(Debug, Default)]
pub struct BlockWindow {
    records: Vec<BlockRecord>,
}

impl BlockWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The oldest retained record.
    pub fn earliest(&self) -> Result<&BlockRecord, TrackerError> {
        self.records.first().ok_or(TrackerError::EmptyWindow)
    }

    /// The newest retained record, or the `(0, "BAD-HASH")` sentinel when the
    /// window is empty.
    pub fn latest(&self) -> BlockRecord {
        match self.records.last() {
            Some(record) => record.clone(),
            None => BlockRecord::new(0, EMPTY_WINDOW_HASH),
        }
    }

    /// Record at window offset `idx` (0 = oldest).
    pub fn get(&self, idx: usize) -> Option<&BlockRecord> {
        self.records.get(idx)
    }

    pub fn records(&self) -> &[BlockRecord] {
        &self.records
    }

    /// Decide whether a freshly fetched block overlaps the retained window.
    ///
    /// The backward scan fetches block `new_latest - scan_idx` at iteration
    /// `scan_idx`; `read_diff` is how far the remote latest advanced past the
    /// tracked latest. The probe position in the existing window is
    /// `(len - 1 + read_diff) - scan_idx`, and only positions strictly after
    /// the oldest record anchor an overlap. A hash match proves every older
    /// retained record is still authoritative, so the scan may stop, provided
    /// the splice keeps enough records to refill the window and the advance
    /// is small enough to be absorbed.
    ///
    /// Number mismatches and too-short splices are surfaced through the error
    /// sink and treated as no-overlap; the window itself is never touched
    /// here.
    pub fn probe_overlap(
        &self,
        read_diff: i64,
        scan_idx: i64,
        fetched: &BlockRecord,
        capacity: i64,
    ) -> Option<SpliceBounds> {
        let saved = self.records.len() as i64;
        if read_diff >= saved {
            // Too far ahead of everything retained; no overlap possible.
            return None;
        }
        let probe_idx = (saved - 1 + read_diff) - scan_idx;
        if probe_idx <= 0 || probe_idx > saved - 1 {
            return None;
        }
        let existing = &self.records[probe_idx as usize];
        if existing.block_number != fetched.block_number {
            tracing::error!(
                fetched_block = fetched.block_number,
                existing_block = existing.block_number,
                probe_idx,
                scan_idx,
                read_diff,
                "window record does not match the scan position"
            );
            return None;
        }
        if existing.hash != fetched.hash {
            return None;
        }
        let overwrite = probe_idx + 1;
        if overwrite < capacity - 1 - scan_idx || read_diff > overwrite {
            tracing::error!(
                block = fetched.block_number,
                overwrite,
                scan_idx,
                read_diff,
                "overlap found but not enough retained blocks to splice"
            );
            return None;
        }
        Some(SpliceBounds {
            keep_from: read_diff,
            keep_until: overwrite,
            tail_from: overwrite - read_diff,
        })
    }

    /// Install the result of a backward scan.
    ///
    /// With splice bounds, the next window is the kept slice of the existing
    /// records followed by `new_tail` (the scanned suffix of the conceptual
    /// new queue, oldest first). Without bounds the window is replaced
    /// wholesale. Returns the number of existing records kept.
    pub fn replace_or_splice(
        &mut self,
        new_tail: Vec<BlockRecord>,
        splice: Option<&SpliceBounds>,
    ) -> usize {
        match splice {
            Some(bounds) => {
                let mut next =
                    self.records[bounds.keep_from as usize..bounds.keep_until as usize].to_vec();
                let kept = next.len();
                next.extend(new_tail);
                self.records = next;
                kept
            }
            None => {
                // Lost connectivity for a long stretch, or a fork deeper than
                // the window. Everything retained is stale.
                self.records = new_tail;
                0
            }
        }
    }

    /// Returns `true` if block numbers are strictly contiguous ascending.
    pub fn is_contiguous(&self) -> bool {
        self.records
            .windows(2)
            .all(|pair| pair[0].precedes(&pair[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(range: std::ops::RangeInclusive<i64>) -> BlockWindow {
        let mut w = BlockWindow::new();
        w.records = range
            .map(|n| BlockRecord::new(n, format!("h{n}")))
            .collect();
        w
    }

    #[test]
    fn empty_window_sentinel() {
        let w = BlockWindow::new();
        assert!(w.earliest().is_err());
        let latest = w.latest();
        assert_eq!(latest.block_number, 0);
        assert_eq!(latest.hash, EMPTY_WINDOW_HASH);
    }

    #[test]
    fn earliest_and_latest() {
        let w = window(97..=100);
        assert_eq!(w.earliest().unwrap().block_number, 97);
        assert_eq!(w.latest().block_number, 100);
        assert!(w.is_contiguous());
    }

    #[test]
    fn probe_finds_overlap_on_advance_by_one() {
        // Window [97..=100], remote latest 101: scan fetches 101 (miss) then
        // 100, which matches the retained tip.
        let w = window(97..=100);
        let miss = w.probe_overlap(1, 0, &BlockRecord::new(101, "h101"), 4);
        assert!(miss.is_none());
        let hit = w
            .probe_overlap(1, 1, &BlockRecord::new(100, "h100"), 4)
            .unwrap();
        assert_eq!(hit.keep_from, 1);
        assert_eq!(hit.keep_until, 4);
        assert_eq!(hit.tail_from, 3);
    }

    #[test]
    fn probe_rejects_hash_mismatch() {
        let w = window(97..=100);
        // Same-height fork: block 100 now has a different hash.
        assert!(w
            .probe_overlap(0, 0, &BlockRecord::new(100, "h100'"), 4)
            .is_none());
        // One block back the chain is unchanged.
        let hit = w
            .probe_overlap(0, 1, &BlockRecord::new(99, "h99"), 4)
            .unwrap();
        assert_eq!(hit.keep_from, 0);
        assert_eq!(hit.keep_until, 3);
        assert_eq!(hit.tail_from, 3);
    }

    #[test]
    fn probe_skipped_when_too_far_ahead() {
        let w = window(97..=100);
        // read_diff >= len: the whole window is stale.
        assert!(w
            .probe_overlap(4, 0, &BlockRecord::new(104, "h104"), 4)
            .is_none());
    }

    #[test]
    fn probe_never_anchors_on_oldest_record() {
        let w = window(97..=100);
        // scan_idx 3 probes index 0, which is excluded by the strict bound.
        assert!(w
            .probe_overlap(0, 3, &BlockRecord::new(97, "h97"), 4)
            .is_none());
    }

    #[test]
    fn probe_reports_number_mismatch_as_no_overlap() {
        let mut w = window(97..=100);
        // Corrupt one record's number; the probe must not anchor on it.
        w.records[2] = BlockRecord::new(42, "h99");
        assert!(w
            .probe_overlap(0, 1, &BlockRecord::new(99, "h99"), 4)
            .is_none());
    }

    #[test]
    fn splice_produces_contiguous_window() {
        let mut w = window(97..=100);
        let bounds = SpliceBounds {
            keep_from: 1,
            keep_until: 4,
            tail_from: 3,
        };
        let kept = w.replace_or_splice(vec![BlockRecord::new(101, "h101")], Some(&bounds));
        assert_eq!(kept, 3);
        assert_eq!(w.len(), 4);
        assert_eq!(w.earliest().unwrap().block_number, 98);
        assert_eq!(w.latest().block_number, 101);
        assert!(w.is_contiguous());
    }

    #[test]
    fn wholesale_replace() {
        let mut w = window(97..=100);
        let fresh: Vec<_> = (105..=108)
            .map(|n| BlockRecord::new(n, format!("h{n}'")))
            .collect();
        let kept = w.replace_or_splice(fresh, None);
        assert_eq!(kept, 0);
        assert_eq!(w.earliest().unwrap().block_number, 105);
        assert_eq!(w.latest().block_number, 108);
        assert!(w.is_contiguous());
    }
}
