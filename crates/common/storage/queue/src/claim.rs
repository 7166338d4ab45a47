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

//! Consumer side of the protocol.
//!
//! A consumer claims an item by renaming `<key>` to `<key>.lock`. Rename is
//! atomic and fails when the source is gone, so of all consumers racing for
//! one item exactly one rename succeeds; the others see `NotFound` and move
//! on. The winner owns the claimed file until it deletes it.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use snafu::ResultExt;

use crate::{
    Result, SequenceKey,
    error::{ClaimSnafu, ReadClaimedSnafu, RemoveClaimedSnafu, RequeueSnafu},
    path::{claimed_path, visible_path},
};

/// Result of one claim attempt.
#[derive(Debug)]
pub(crate) enum ClaimOutcome {
    /// This consumer now exclusively owns the item.
    Claimed(ClaimedItem),
    /// Another consumer renamed the item first.
    Lost,
}

/// An item this consumer owns, sitting at its claimed path.
#[derive(Debug)]
pub(crate) struct ClaimedItem {
    key:     SequenceKey,
    claimed: PathBuf,
    visible: PathBuf,
}

/// Attempts to move `<key>` to `<key>.lock`.
pub(crate) fn try_claim(base: &Path, key: SequenceKey) -> Result<ClaimOutcome> {
    let visible = visible_path(base, key);
    let claimed = claimed_path(base, key);

    match fs::rename(&visible, &claimed) {
        Ok(()) => Ok(ClaimOutcome::Claimed(ClaimedItem {
            key,
            claimed,
            visible,
        })),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ClaimOutcome::Lost),
        Err(e) => Err(e).context(ClaimSnafu { path: visible }),
    }
}

impl ClaimedItem {
    pub(crate) const fn key(&self) -> SequenceKey { self.key }

    pub(crate) fn path(&self) -> &Path { &self.claimed }

    pub(crate) fn read(&self) -> Result<Vec<u8>> {
        fs::read(&self.claimed).context(ReadClaimedSnafu {
            path: &self.claimed,
        })
    }

    /// Deletes the claimed file, ending the item's life.
    pub(crate) fn remove(self) -> Result<()> {
        fs::remove_file(&self.claimed).context(RemoveClaimedSnafu {
            path: &self.claimed,
        })
    }

    /// Renames the claimed file back to its visible name.
    pub(crate) fn requeue(self) -> Result<()> {
        fs::rename(&self.claimed, &self.visible).context(RequeueSnafu {
            path: &self.claimed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Barrier},
        thread,
    };

    use super::*;
    use crate::QueueError;

    fn key(timestamp: u64) -> SequenceKey { SequenceKey::new(timestamp, 0).unwrap() }

    #[test]
    fn test_claim_moves_visible_to_claimed() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(visible_path(base, key(1)), b"item").unwrap();

        let ClaimOutcome::Claimed(item) = try_claim(base, key(1)).unwrap() else {
            panic!("expected claim to succeed");
        };

        assert_eq!(item.key(), key(1));
        assert_eq!(item.path(), claimed_path(base, key(1)));
        assert!(!visible_path(base, key(1)).exists());
        assert_eq!(item.read().unwrap(), b"item");

        item.remove().unwrap();
        assert!(!claimed_path(base, key(1)).exists());
    }

    #[test]
    fn test_claim_of_missing_item_is_lost() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            try_claim(temp_dir.path(), key(1)).unwrap(),
            ClaimOutcome::Lost
        ));
    }

    #[test]
    fn test_second_claim_loses() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(visible_path(base, key(1)), b"item").unwrap();

        assert!(matches!(
            try_claim(base, key(1)).unwrap(),
            ClaimOutcome::Claimed(_)
        ));
        assert!(matches!(
            try_claim(base, key(1)).unwrap(),
            ClaimOutcome::Lost
        ));
    }

    #[test]
    fn test_requeue_restores_visible_name() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(visible_path(base, key(1)), b"item").unwrap();

        let ClaimOutcome::Claimed(item) = try_claim(base, key(1)).unwrap() else {
            panic!("expected claim to succeed");
        };
        item.requeue().unwrap();

        assert_eq!(fs::read(visible_path(base, key(1))).unwrap(), b"item");
        assert!(!claimed_path(base, key(1)).exists());
    }

    #[test]
    fn test_read_after_external_removal_is_an_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(visible_path(base, key(1)), b"item").unwrap();

        let ClaimOutcome::Claimed(item) = try_claim(base, key(1)).unwrap() else {
            panic!("expected claim to succeed");
        };
        fs::remove_file(claimed_path(base, key(1))).unwrap();

        assert!(matches!(
            item.read().unwrap_err(),
            QueueError::ReadClaimed { .. }
        ));
    }

    #[test]
    fn test_racing_claims_have_one_winner() {
        const CONTENDERS: usize = 16;

        for round in 0..20 {
            let temp_dir = tempfile::TempDir::new().unwrap();
            let base = Arc::new(temp_dir.path().to_path_buf());
            fs::write(visible_path(base.as_path(), key(round)), b"item").unwrap();

            let barrier = Arc::new(Barrier::new(CONTENDERS));
            let handles: Vec<_> = (0..CONTENDERS)
                .map(|_| {
                    let base = Arc::clone(&base);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        matches!(
                            try_claim(base.as_path(), key(round)).unwrap(),
                            ClaimOutcome::Claimed(_)
                        )
                    })
                })
                .collect();

            let winners = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count();
            assert_eq!(winners, 1, "round {round}");
        }
    }
}
