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

//! Directory change notifications for blocked consumers.
//!
//! The watcher only shortens the wait between scans. A missed or spurious
//! event costs at most one poll interval or one extra scan, so consumers
//! behave the same with or without it.

use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use crossbeam::channel::{Receiver, RecvTimeoutError, unbounded};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use snafu::ResultExt;
use tokio::sync::Notify;
use tracing::warn;

use crate::{Result, error::WatchSnafu};

/// Watches the queue root (non-recursively) and signals on every change.
///
/// Each change is delivered twice: over a channel for blocking waiters and
/// as a [`Notify`] permit for async waiters.
pub(crate) struct DirWatcher {
    /// Held for its `Drop`, which stops the notification thread.
    _watcher: Mutex<RecommendedWatcher>,
    events:   Receiver<()>,
    changed:  Arc<Notify>,
}

impl DirWatcher {
    pub(crate) fn new(path: &Path) -> Result<Self> {
        let (tx, events) = unbounded();
        let changed = Arc::new(Notify::new());
        let on_change = Arc::clone(&changed);

        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| match res {
                Ok(event) if !matches!(event.kind, EventKind::Access(_)) => {
                    // The receiver lives as long as the watcher.
                    let _ = tx.send(());
                    on_change.notify_one();
                }
                Ok(_) => {}
                Err(e) => warn!(error = ?e, "Queue directory watcher error"),
            })
            .context(WatchSnafu { path })?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .context(WatchSnafu { path })?;

        Ok(Self {
            _watcher: Mutex::new(watcher),
            events,
            changed,
        })
    }

    /// Completes on the next change. A change reported while nobody was
    /// waiting completes the next call immediately.
    pub(crate) async fn changed(&self) { self.changed.notified().await; }

    /// Blocks until a change is reported or `timeout` elapses. Returns `true`
    /// when woken by a change. Pending events are drained either way.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let woken = match self.events.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                false
            }
        };
        while self.events.try_recv().is_ok() {}
        woken
    }
}
