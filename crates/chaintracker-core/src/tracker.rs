//! The chain tracker — polls a remote node, maintains the block window,
//! detects forks, and dispatches new-block and fork events.
//!
//! # Phases
//!
//! **Bootstrap**: fetch the remote latest block number and drive the repairer
//! until the window holds `blocks_to_save` contiguous records, retrying a
//! bounded number of times before failing construction.
//!
//! **Poll loop**: a dedicated background task ticks at a tenth of the average
//! block time. Each tick fetches the remote latest, decides whether the chain
//! advanced or forked, repairs the window if so, and dispatches events. Fetch
//! failures back the tick period off exponentially; the window is never
//! mutated on a failed cycle.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backoff::{exponential_backoff, INIT_RETRIES};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::fetcher::{ChainFetcher, EndpointDescriptor};
use crate::handler::HandlerRegistry;
use crate::query::WantedBlocks;
use crate::types::{BlockRecord, BlockSelector};
use crate::window::{BlockWindow, SpliceBounds};

/// Tracks the most recent blocks of a remote chain in a bounded window.
///
/// Cheap to share: readers call [`get_latest_block_data`] and
/// [`latest_number`] from any task while the background poll task keeps the
/// window current.
///
/// [`get_latest_block_data`]: ChainTracker::get_latest_block_data
/// [`latest_number`]: ChainTracker::latest_number
pub struct ChainTracker {
    inner: Arc<TrackerInner>,
    shutdown: watch::Sender<bool>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ChainTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainTracker")
            .field("endpoint", &self.inner.endpoint)
            .finish()
    }
}

struct TrackerInner {
    fetcher: Arc<dyn ChainFetcher>,
    window: RwLock<BlockWindow>,
    /// Kept in sync with the newest window record inside the exclusive
    /// section; read lock-free on hot paths.
    latest_block_num: AtomicI64,
    blocks_to_save: u64,
    server_block_memory: u64,
    block_checkpoint_distance: u64,
    block_checkpoint: AtomicI64,
    handlers: HandlerRegistry,
    endpoint: EndpointDescriptor,
}

impl ChainTracker {
    /// Validate the configuration, bootstrap the window from the remote, and
    /// start the background poll task.
    pub async fn spawn(
        fetcher: Arc<dyn ChainFetcher>,
        config: TrackerConfig,
        handlers: HandlerRegistry,
    ) -> Result<Self, TrackerError> {
        config.validate()?;
        let endpoint = fetcher.endpoint().clone();
        let inner = Arc::new(TrackerInner {
            fetcher,
            window: RwLock::new(BlockWindow::new()),
            latest_block_num: AtomicI64::new(0),
            blocks_to_save: config.blocks_to_save,
            server_block_memory: config.server_block_memory,
            block_checkpoint_distance: config.block_checkpoint_distance,
            block_checkpoint: AtomicI64::new(0),
            handlers,
            endpoint,
        });

        inner.bootstrap().await?;

        // Tick well below the block time so quick successions are not missed.
        let tick = config.average_block_time / 10;
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task_inner = Arc::clone(&inner);
        let handle = tokio::spawn(async move {
            task_inner.poll_loop(shutdown_rx, tick).await;
        });

        Ok(Self {
            inner,
            shutdown,
            poll_task: Mutex::new(Some(handle)),
        })
    }

    /// The newest tracked block number, read without taking the window lock.
    pub fn latest_number(&self) -> i64 {
        self.inner.latest_block_num()
    }

    /// Copy the requested records out of the window.
    ///
    /// Returns the hashes of blocks `[from ..= to]` ascending, with
    /// `specific` appended when it is not already inside the range. Omitting
    /// `from` or `to` narrows the result to the specific block alone. The
    /// returned records are copies; later repairs never mutate them.
    pub fn get_latest_block_data(
        &self,
        from: BlockSelector,
        to: BlockSelector,
        specific: BlockSelector,
    ) -> Result<(i64, Vec<BlockRecord>), TrackerError> {
        let window = self.inner.window.read().unwrap();
        let latest = self.inner.latest_block_num();
        if window.is_empty() {
            return Err(TrackerError::EmptyWindow);
        }
        let earliest = window.earliest()?.block_number;
        let wanted = WantedBlocks::new(from, to, specific, latest, earliest)?;

        let mut records = Vec::new();
        for idx in wanted.iteration_indexes() {
            let record = window.get(idx).ok_or_else(|| {
                TrackerError::WindowInconsistency(format!(
                    "iteration index {idx} is outside the window"
                ))
            })?;
            if !wanted.is_wanted(record.block_number) {
                return Err(TrackerError::WindowInconsistency(format!(
                    "window offset {idx} holds block {}, which the query did not ask for",
                    record.block_number
                )));
            }
            records.push(record.clone());
        }
        Ok((latest, records))
    }

    /// Endpoint description of the remote this tracker follows.
    pub fn endpoint(&self) -> &EndpointDescriptor {
        &self.inner.endpoint
    }

    /// Signal the poll task to stop and wait for it to exit.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.poll_task.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl TrackerInner {
    fn latest_block_num(&self) -> i64 {
        self.latest_block_num.load(Ordering::Acquire)
    }

    fn set_latest_block_num(&self, value: i64) {
        self.latest_block_num.store(value, Ordering::Release);
    }

    /// Fetch a block hash, pre-rejecting requests beyond the remote's
    /// backward-lookup horizon without touching the node.
    async fn fetch_block_hash(&self, block_number: i64) -> Result<String, TrackerError> {
        let latest = self.latest_block_num();
        if block_number < latest - self.server_block_memory as i64 {
            return Err(TrackerError::TooOldForRemote {
                requested: block_number,
                latest,
                server_block_memory: self.server_block_memory,
            });
        }
        self.fetcher.fetch_block_hash(block_number).await
    }

    /// Decide whether the remote's chain diverged from the retained tip.
    ///
    /// When the chain advanced, the comparison still targets the previously
    /// saved latest's number: that block is historically resolvable, and a
    /// changed hash there proves the retained suffix is stale. The window
    /// lock is never held across the remote call.
    async fn fork_changed(&self, new_latest: i64) -> Result<bool, TrackerError> {
        if new_latest == self.latest_block_num() {
            // No new block arrived; compare the tip hash directly.
            let hash = self.fetch_block_hash(new_latest).await?;
            let saved = self.window.read().unwrap().latest();
            return Ok(saved.hash != hash);
        }
        let saved = self.window.read().unwrap().latest();
        let prev_hash = self.fetch_block_hash(saved.block_number).await?;
        Ok(saved.hash != prev_hash)
    }

    /// Backward scan: fetch hashes from `new_latest` down until one overlaps
    /// the retained window or the scan covers a full window.
    ///
    /// Returns the fetched records (newest first) and the splice bounds when
    /// an overlap was found. Each remote fetch happens without any window
    /// lock; the overlap probe takes the shared lock briefly per iteration.
    async fn read_hashes(
        &self,
        new_latest: i64,
        read_diff: i64,
    ) -> Result<(Vec<BlockRecord>, Option<SpliceBounds>), TrackerError> {
        let capacity = self.blocks_to_save as i64;
        let mut scanned = Vec::with_capacity(capacity as usize);
        for scan_idx in 0..capacity {
            let block_number = new_latest - scan_idx;
            let hash = self.fetch_block_hash(block_number).await.map_err(|err| {
                tracing::error!(
                    block = block_number,
                    error = %err,
                    endpoint = %self.endpoint,
                    "could not fetch block hash during backward scan"
                );
                err
            })?;
            let record = BlockRecord::new(block_number, hash);
            let overlap =
                self.window
                    .read()
                    .unwrap()
                    .probe_overlap(read_diff, scan_idx, &record, capacity);
            if let Some(bounds) = overlap {
                tracing::debug!(
                    block = block_number,
                    hash = %record.hash,
                    kept_blocks = bounds.kept(),
                    endpoint = %self.endpoint,
                    "fetched hash already tracked, stopping backward scan"
                );
                return Ok((scanned, Some(bounds)));
            }
            scanned.push(record);
        }
        Ok((scanned, None))
    }

    /// Repair the window against `new_latest`: scan backwards, then splice or
    /// wholesale-replace under the exclusive lock. Returns the post-repair
    /// tip hash.
    async fn fetch_all_previous_blocks(&self, new_latest: i64) -> Result<String, TrackerError> {
        let current_latest = self.latest_block_num();
        if new_latest < current_latest {
            return Err(TrackerError::MonotonicityViolation {
                provided: new_latest,
                current: current_latest,
            });
        }
        let read_diff = new_latest - current_latest;
        let (mut tail, splice) = self.read_hashes(new_latest, read_diff).await?;
        tail.reverse(); // scanned newest-first; the window wants oldest-first

        let (kept, window_len, latest_hash) = {
            let mut window = self.window.write().unwrap();
            self.set_latest_block_num(new_latest);
            if let Some(bounds) = &splice {
                // The scanned tail is exactly the suffix of the conceptual
                // new queue starting at `tail_from`.
                debug_assert_eq!(
                    bounds.tail_from as usize + tail.len(),
                    self.blocks_to_save as usize
                );
            }
            let kept = window.replace_or_splice(tail, splice.as_ref());
            (kept, window.len(), window.latest().hash)
        };
        if (window_len as u64) < self.blocks_to_save {
            return Err(TrackerError::WindowInconsistency(format!(
                "repair saved only {window_len} of {} blocks",
                self.blocks_to_save
            )));
        }

        // Log only when something interesting happened or a checkpoint passed.
        let checkpoint = self.block_checkpoint.load(Ordering::Relaxed);
        if read_diff > 1 || checkpoint + (self.block_checkpoint_distance as i64) < new_latest {
            self.block_checkpoint.store(new_latest, Ordering::Relaxed);
            tracing::debug!(
                latest_block = new_latest,
                latest_hash = %latest_hash,
                window_len,
                blocks_queried = self.blocks_to_save as usize - kept,
                blocks_kept = kept,
                chain_id = %self.endpoint.chain_id,
                api_interface = %self.endpoint.api_interface,
                "updated tracked block hashes"
            );
        }
        Ok(latest_hash)
    }

    /// One poll cycle: detect advancement and forks, repair if needed,
    /// dispatch events.
    async fn poll_cycle(&self) -> Result<(), TrackerError> {
        let new_latest = self.fetcher.fetch_latest_block_number().await?;
        let got_new_block = new_latest > self.latest_block_num();
        let forked = self.fork_changed(new_latest).await?;
        if !got_new_block && !forked {
            return Ok(());
        }

        let prev_latest = self.latest_block_num();
        let latest_hash = self.fetch_all_previous_blocks(new_latest).await?;
        if got_new_block {
            // Catch-up runs report every block, each with the post-repair tip
            // hash.
            for block_number in prev_latest + 1..=new_latest {
                self.handlers.dispatch_new_latest(block_number, &latest_hash);
            }
        }
        if forked {
            self.handlers.dispatch_fork(new_latest);
        }
        Ok(())
    }

    /// Initial fetch with bounded retries; fatal on exhaustion.
    async fn bootstrap(&self) -> Result<(), TrackerError> {
        let mut latest = self.fetcher.fetch_latest_block_number().await;
        let mut retry = 0;
        while latest.is_err() && retry < INIT_RETRIES {
            tracing::debug!(
                retry,
                endpoint = %self.endpoint,
                "retrying latest block number fetch during bootstrap"
            );
            latest = self.fetcher.fetch_latest_block_number().await;
            retry += 1;
        }
        let new_latest = match latest {
            Ok(number) => number,
            Err(err) => {
                return Err(TrackerError::BootstrapFailed {
                    retries: INIT_RETRIES,
                    reason: err.to_string(),
                })
            }
        };

        let mut populated = self.fetch_all_previous_blocks(new_latest).await;
        let mut retry = 0;
        while populated.is_err() && retry < INIT_RETRIES {
            tracing::debug!(
                retry,
                endpoint = %self.endpoint,
                "retrying window population during bootstrap"
            );
            populated = self.fetch_all_previous_blocks(new_latest).await;
            retry += 1;
        }
        match populated {
            Ok(_) => Ok(()),
            Err(err) => Err(TrackerError::BootstrapFailed {
                retries: INIT_RETRIES,
                reason: err.to_string(),
            }),
        }
    }

    /// The background poll task. Runs until the shutdown signal fires; an
    /// in-flight cycle is abandoned at its next suspension point.
    async fn poll_loop(&self, mut shutdown_rx: watch::Receiver<bool>, tick: Duration) {
        let mut fails: u32 = 0;
        let mut period = tick;
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = tokio::time::sleep(period) => {}
            }
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                result = self.poll_cycle() => match result {
                    Ok(()) => {
                        if fails != 0 {
                            fails = 0;
                            period = tick;
                        }
                    }
                    Err(err) => {
                        fails += 1;
                        period = exponential_backoff(tick, fails);
                        tracing::error!(
                            error = %err,
                            fails,
                            next_poll = ?period,
                            endpoint = %self.endpoint,
                            "poll cycle failed"
                        );
                    }
                },
            }
        }
        tracing::debug!(endpoint = %self.endpoint, "poll task stopped");
    }
}
