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

//! Producer side of the protocol.
//!
//! An item is written under its claimed name `<key>.lock`, which consumers
//! skip, and then renamed to `<key>`. The rename is the publish point: before
//! it the item does not exist for consumers, after it the item is complete.
//!
//! ## Key collisions
//!
//! `rename` silently replaces an existing destination on POSIX, so two
//! producers that drew the same key could overwrite each other's item. The
//! staging file is therefore created with `create_new`, and the visible name
//! is checked once the staging file exists. Either collision draws a new key.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::Path,
};

use snafu::ResultExt;
use tracing::{debug, warn};

use crate::{
    FlushMode, Result, SequenceKey,
    error::{KeyCollisionSnafu, PublishSnafu, StageSnafu},
    metrics::QUEUE_KEY_COLLISION,
    path::{claimed_path, visible_path},
};

/// Keys drawn before giving up on a put.
pub(crate) const MAX_KEY_ATTEMPTS: usize = 16;

/// Stages and publishes `bytes` under a fresh key.
pub(crate) fn publish(base: &Path, bytes: &[u8], flush_mode: FlushMode) -> Result<SequenceKey> {
    publish_with(base, bytes, flush_mode, SequenceKey::now)
}

pub(crate) fn publish_with<F>(
    base: &Path,
    bytes: &[u8],
    flush_mode: FlushMode,
    mut next_key: F,
) -> Result<SequenceKey>
where
    F: FnMut() -> SequenceKey,
{
    for _ in 0..MAX_KEY_ATTEMPTS {
        let key = next_key();
        let staging = claimed_path(base, key);
        let visible = visible_path(base, key);

        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                collision(key);
                continue;
            }
            Err(e) => return Err(e).context(StageSnafu { path: staging }),
        };

        if fs::symlink_metadata(&visible).is_ok() {
            drop(file);
            discard_staging(&staging);
            collision(key);
            continue;
        }

        // A failed write leaves the staging file behind. It was never visible.
        write_staging(file, bytes, flush_mode).context(StageSnafu { path: &staging })?;

        fs::rename(&staging, &visible).context(PublishSnafu { path: &visible })?;

        debug!(%key, bytes = bytes.len(), "Published item");
        return Ok(key);
    }

    KeyCollisionSnafu {
        attempts: MAX_KEY_ATTEMPTS,
    }
    .fail()
}

fn write_staging(mut file: fs::File, bytes: &[u8], flush_mode: FlushMode) -> io::Result<()> {
    file.write_all(bytes)?;
    if flush_mode == FlushMode::Sync {
        file.sync_all()?;
    }
    Ok(())
}

/// Removes an empty staging file after a collision. Returns `false` when the
/// file could not be removed and is left behind.
fn discard_staging(staging: &Path) -> bool {
    match fs::remove_file(staging) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = ?staging, error = %e, "Failed to remove staging file after key collision");
            false
        }
    }
}

fn collision(key: SequenceKey) {
    QUEUE_KEY_COLLISION.inc();
    warn!(%key, "Sequence key already in use, drawing another");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QueueError, path::scan_entries};

    fn key(timestamp: u64) -> SequenceKey { SequenceKey::new(timestamp, 0).unwrap() }

    #[test]
    fn test_publish_writes_visible_file_only() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let base = temp_dir.path();

        let published = publish(base, b"payload", FlushMode::Sync).unwrap();

        assert_eq!(
            fs::read(visible_path(base, published)).unwrap(),
            b"payload"
        );
        assert!(!claimed_path(base, published).exists());
        assert_eq!(scan_entries(base).unwrap().len(), 1);
    }

    #[test]
    fn test_publish_redraws_when_visible_name_taken() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(visible_path(base, key(1)), b"existing").unwrap();

        let mut keys = vec![key(2), key(1)];
        let published = publish_with(base, b"new", FlushMode::Async, || keys.pop().unwrap()).unwrap();

        assert_eq!(published, key(2));
        assert_eq!(fs::read(visible_path(base, key(1))).unwrap(), b"existing");
        assert_eq!(fs::read(visible_path(base, key(2))).unwrap(), b"new");
        assert!(!claimed_path(base, key(1)).exists());
    }

    #[test]
    fn test_publish_redraws_when_staging_name_taken() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(claimed_path(base, key(1)), b"in flight").unwrap();

        let mut keys = vec![key(2), key(1)];
        let published = publish_with(base, b"new", FlushMode::Async, || keys.pop().unwrap()).unwrap();

        assert_eq!(published, key(2));
        assert_eq!(fs::read(claimed_path(base, key(1))).unwrap(), b"in flight");
    }

    #[test]
    fn test_publish_gives_up_after_max_attempts() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(visible_path(base, key(1)), b"existing").unwrap();

        let mut draws = 0;
        let err = publish_with(base, b"new", FlushMode::Async, || {
            draws += 1;
            key(1)
        })
        .unwrap_err();

        assert!(matches!(err, QueueError::KeyCollision { attempts } if attempts == MAX_KEY_ATTEMPTS));
        assert_eq!(draws, MAX_KEY_ATTEMPTS);
        assert!(!claimed_path(base, key(1)).exists());
    }

    #[test]
    fn test_discard_staging() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let staging = claimed_path(temp_dir.path(), key(1));
        fs::write(&staging, b"").unwrap();

        assert!(discard_staging(&staging));
        assert!(!staging.exists());
        // Already removed.
        assert!(!discard_staging(&staging));
    }

    #[test]
    fn test_publish_into_missing_directory_fails_at_stage() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let err = publish(&missing, b"x", FlushMode::Async).unwrap_err();
        assert!(matches!(err, QueueError::Stage { .. }));
    }
}
