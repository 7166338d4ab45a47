// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The queue handle.
//!
//! A [`FileQueue`] is a view of a shared directory. It holds no item state of
//! its own: every operation lists the directory and acts through renames, so
//! any number of handles, in any number of processes, can work on the same
//! root at once.
//!
//! ## Usage
//!
//! ```no_run
//! use fsqueue::QueueBuilder;
//!
//! # fn main() -> fsqueue::Result<()> {
//! let queue = QueueBuilder::new("/tmp/jobs").build::<String>()?;
//!
//! queue.put(&"resize image 42".to_string())?;
//! assert_eq!(queue.qsize()?, 1);
//!
//! // Blocks until an item can be claimed.
//! let job = queue.get()?;
//! # Ok(())
//! # }
//! ```

use std::{
    marker::PhantomData,
    path::Path,
    thread,
    time::{Duration, Instant},
};

use snafu::ResultExt;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    Codec, JsonCodec, QueueConfig, QueueError, Result, SequenceKey,
    claim::{ClaimOutcome, ClaimedItem, try_claim},
    error::{BoxedError, CreateDirSnafu, EncodeSnafu},
    metrics::{QUEUE_CLAIM_RACE_LOST, QUEUE_GET, QUEUE_POLL_WAIT, QUEUE_PUT, QUEUE_REQUEUED},
    path::{EntryState, scan_entries, scan_visible},
    publish::publish,
    watch::DirWatcher,
};

/// Point-in-time counts of the item files in a queue directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Items available to consumers.
    pub visible: usize,
    /// Items being published or consumed right now, plus staging files
    /// leaked by failed writes.
    pub claimed: usize,
}

/// A multi-producer, multi-consumer queue stored as files in one directory.
///
/// `T` is the payload type and `C` the [`Codec`] turning payloads into file
/// contents. The handle is `Send + Sync` whenever `C` is.
pub struct FileQueue<T, C = JsonCodec> {
    config:   QueueConfig,
    codec:    C,
    /// Present when `config.watch` is set.
    watcher:  Option<DirWatcher>,
    _payload: PhantomData<fn() -> T>,
}

impl<T, C: Codec<T>> FileQueue<T, C> {
    /// Opens the queue at `config.base_path`, creating the directory if it
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or, with `watch`
    /// enabled, if the directory watcher cannot be installed.
    pub fn open(config: QueueConfig, codec: C) -> Result<Self> {
        std::fs::create_dir_all(&config.base_path).context(CreateDirSnafu {
            path: &config.base_path,
        })?;

        let watcher = if config.watch {
            Some(DirWatcher::new(&config.base_path)?)
        } else {
            None
        };

        info!(
            path = ?config.base_path,
            fifo = config.fifo,
            poll_interval = ?config.poll_interval,
            watch = config.watch,
            "Queue opened"
        );

        Ok(Self {
            config,
            codec,
            watcher,
            _payload: PhantomData,
        })
    }

    /// Enqueues one item and returns the key it was published under.
    ///
    /// The item becomes visible to consumers atomically, fully written.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails, if the staging file cannot be
    /// written or renamed, or if no free sequence key could be drawn. A
    /// staging file left by a failed write is never visible to consumers.
    pub fn put(&self, item: &T) -> Result<SequenceKey> {
        let bytes = self
            .codec
            .encode(item)
            .map_err(|e| Box::new(e) as BoxedError)
            .context(EncodeSnafu)?;

        let key = publish(&self.config.base_path, &bytes, self.config.flush_mode)?;
        QUEUE_PUT.inc();
        Ok(key)
    }

    /// Dequeues one item, blocking until one can be claimed.
    ///
    /// An empty queue is not an error: the call re-scans every
    /// `poll_interval` for as long as it takes.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed, or if an item was
    /// claimed but could not be read, decoded or deleted.
    pub fn get(&self) -> Result<T> {
        loop {
            if let Some(item) = self.try_get()? {
                return Ok(item);
            }
            self.wait(self.config.poll_interval);
        }
    }

    /// Makes one pass over the directory and claims the first available item
    /// in queue order. Returns `None` when nothing could be claimed.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn try_get(&self) -> Result<Option<T>> {
        for key in self.candidates()? {
            match try_claim(&self.config.base_path, key)? {
                ClaimOutcome::Claimed(item) => return self.consume(item).map(Some),
                ClaimOutcome::Lost => {
                    QUEUE_CLAIM_RACE_LOST.inc();
                    trace!(%key, "Lost claim race");
                }
            }
        }
        Ok(None)
    }

    /// Like [`get`](Self::get) but gives up after `timeout`, returning
    /// `None`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn get_timeout(&self, timeout: Duration) -> Result<Option<T>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(item) = self.try_get()? {
                return Ok(Some(item));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            self.wait(remaining.min(self.config.poll_interval));
        }
    }

    /// Like [`get`](Self::get) but returns `None` once `cancel` fires. The
    /// token is checked before every scan, so cancellation takes effect
    /// within one poll interval.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn get_cancellable(&self, cancel: &CancellationToken) -> Result<Option<T>> {
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            if let Some(item) = self.try_get()? {
                return Ok(Some(item));
            }
            self.wait(self.config.poll_interval);
        }
    }

    /// Async form of [`get_cancellable`](Self::get_cancellable) for tokio
    /// callers. Waits on the tokio timer, or on the directory watcher when
    /// `watch` is enabled, instead of blocking the thread.
    ///
    /// Each scan is synchronous file I/O. On a multi-thread runtime it runs
    /// under [`block_in_place`](tokio::task::block_in_place); on a
    /// current-thread runtime it runs inline and holds the executor for the
    /// length of one directory pass.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub async fn get_async(&self, cancel: &CancellationToken) -> Result<Option<T>> {
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            if let Some(item) = self.try_get_in_runtime()? {
                return Ok(Some(item));
            }
            QUEUE_POLL_WAIT.inc();
            trace!(timeout = ?self.config.poll_interval, "Queue empty, waiting");
            let changed = async {
                match &self.watcher {
                    Some(watcher) => watcher.changed().await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                () = cancel.cancelled() => return Ok(None),
                () = tokio::time::sleep(self.config.poll_interval) => {}
                () = changed => {}
            }
        }
    }

    /// Approximate number of visible items.
    ///
    /// Staging and claimed files are never counted. The value is stale as
    /// soon as it is returned when other processes are active.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn qsize(&self) -> Result<usize> { Ok(scan_visible(&self.config.base_path)?.len()) }

    /// Whether [`qsize`](Self::qsize) is zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn is_empty(&self) -> Result<bool> { Ok(self.qsize()? == 0) }

    /// Counts visible and claimed item files in one listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn stats(&self) -> Result<QueueStats> {
        let mut stats = QueueStats::default();
        for (_, state) in scan_entries(&self.config.base_path)? {
            match state {
                EntryState::Visible => stats.visible += 1,
                EntryState::Claimed => stats.claimed += 1,
            }
        }
        Ok(stats)
    }

    /// Iterates over items claimable right now, without blocking. Ends at
    /// the first pass that finds nothing, or after yielding an error.
    pub const fn drain(&self) -> Drain<'_, T, C> {
        Drain {
            queue: self,
            done:  false,
        }
    }

    /// The queue directory.
    #[must_use]
    pub fn root(&self) -> &Path { &self.config.base_path }

    #[must_use]
    pub const fn config(&self) -> &QueueConfig { &self.config }

    /// Visible keys in claim order.
    fn candidates(&self) -> Result<Vec<SequenceKey>> {
        let mut keys = scan_visible(&self.config.base_path)?;
        if self.config.fifo {
            keys.sort_unstable();
        } else {
            keys.sort_unstable_by(|a, b| b.cmp(a));
        }
        Ok(keys)
    }

    /// Reads, decodes and deletes a claimed item.
    fn consume(&self, item: ClaimedItem) -> Result<T> {
        let bytes = item.read()?;

        match self.codec.decode(&bytes) {
            Ok(payload) => {
                let key = item.key();
                item.remove()?;
                QUEUE_GET.inc();
                debug!(%key, bytes = bytes.len(), "Consumed item");
                Ok(payload)
            }
            Err(e) => {
                let path = item.path().to_path_buf();
                if self.config.requeue_on_decode_error {
                    item.requeue()?;
                    QUEUE_REQUEUED.inc();
                    warn!(path = ?path, error = %e, "Undecodable item returned to the queue");
                } else {
                    warn!(path = ?path, error = %e, "Undecodable item left at its claimed path");
                }
                Err(QueueError::Decode {
                    path,
                    source: Box::new(e),
                })
            }
        }
    }

    fn try_get_in_runtime(&self) -> Result<Option<T>> {
        match Handle::try_current().map(|handle| handle.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(|| self.try_get()),
            _ => self.try_get(),
        }
    }

    fn wait(&self, timeout: Duration) {
        QUEUE_POLL_WAIT.inc();
        trace!(?timeout, "Queue empty, waiting");
        match &self.watcher {
            Some(watcher) => {
                watcher.wait(timeout);
            }
            None => thread::sleep(timeout),
        }
    }
}

/// Iterator returned by [`FileQueue::drain`].
pub struct Drain<'a, T, C> {
    queue: &'a FileQueue<T, C>,
    done:  bool,
}

impl<T, C: Codec<T>> Iterator for Drain<'_, T, C> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.queue.try_get() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
