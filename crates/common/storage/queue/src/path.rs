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

//! Item file naming and directory scanning.
//!
//! Directory listing only ever looks at names. Entries may be renamed or
//! removed by other processes between the listing and any later use, so
//! nothing here opens or stats a file.

use std::path::{Path, PathBuf};

use snafu::ResultExt;

use crate::{Result, SequenceKey, error::ListDirSnafu};

/// Suffix marking a file as claimed: staged by a producer or owned by a
/// consumer.
pub const CLAIMED_SUFFIX: &str = ".lock";

/// State of an item file, as encoded in its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryState {
    /// Fully written and claimable.
    Visible,
    /// Mid-publish or owned by exactly one consumer.
    Claimed,
}

/// Returns `base/<key>`.
pub fn visible_path<P: AsRef<Path>>(base: P, key: SequenceKey) -> PathBuf {
    base.as_ref().join(key.to_string())
}

/// Returns `base/<key>.lock`.
pub fn claimed_path<P: AsRef<Path>>(base: P, key: SequenceKey) -> PathBuf {
    base.as_ref().join(format!("{key}{CLAIMED_SUFFIX}"))
}

/// Classifies a file name. Returns `None` for names the queue did not write.
pub fn classify(name: &str) -> Option<(SequenceKey, EntryState)> {
    match name.strip_suffix(CLAIMED_SUFFIX) {
        Some(stem) => stem.parse().ok().map(|key| (key, EntryState::Claimed)),
        None => name.parse().ok().map(|key| (key, EntryState::Visible)),
    }
}

/// Lists every item file under `base`, skipping foreign entries.
pub fn scan_entries<P: AsRef<Path>>(base: P) -> Result<Vec<(SequenceKey, EntryState)>> {
    let base = base.as_ref();
    let mut entries = Vec::new();

    for entry in std::fs::read_dir(base).context(ListDirSnafu { path: base })? {
        let entry = entry.context(ListDirSnafu { path: base })?;
        if let Some(item) = entry.file_name().to_str().and_then(classify) {
            entries.push(item);
        }
    }

    Ok(entries)
}

/// Lists the keys of visible items under `base`, unsorted.
pub fn scan_visible<P: AsRef<Path>>(base: P) -> Result<Vec<SequenceKey>> {
    Ok(scan_entries(base)?
        .into_iter()
        .filter_map(|(key, state)| (state == EntryState::Visible).then_some(key))
        .collect())
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn key(timestamp: u64, tiebreak: u16) -> SequenceKey {
        SequenceKey::new(timestamp, tiebreak).unwrap()
    }

    #[test]
    fn test_paths() {
        let k = key(1_760_784_000_123_456, 42);
        assert_eq!(
            visible_path("/queue", k),
            PathBuf::from("/queue/1760784000123456-0042")
        );
        assert_eq!(
            claimed_path("/queue", k),
            PathBuf::from("/queue/1760784000123456-0042.lock")
        );
    }

    #[test_case("1760784000123456-0042", Some(EntryState::Visible) ; "visible")]
    #[test_case("1760784000123456-0042.lock", Some(EntryState::Claimed) ; "claimed")]
    #[test_case("1760784000123456-0042.lock.lock", None ; "double suffix")]
    #[test_case("notes.lock", None ; "foreign claimed")]
    #[test_case(".DS_Store", None ; "foreign hidden")]
    fn test_classify(name: &str, expected: Option<EntryState>) {
        assert_eq!(classify(name).map(|(_, state)| state), expected);
    }

    #[test]
    fn test_scan_entries_skips_foreign_files() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let base = temp_dir.path();

        std::fs::write(visible_path(base, key(1, 0)), b"a").unwrap();
        std::fs::write(visible_path(base, key(2, 0)), b"b").unwrap();
        std::fs::write(claimed_path(base, key(3, 0)), b"c").unwrap();
        std::fs::write(base.join("README"), b"not an item").unwrap();
        std::fs::create_dir(base.join("nested")).unwrap();

        let mut entries = scan_entries(base).unwrap();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                (key(1, 0), EntryState::Visible),
                (key(2, 0), EntryState::Visible),
                (key(3, 0), EntryState::Claimed),
            ]
        );

        let mut visible = scan_visible(base).unwrap();
        visible.sort();
        assert_eq!(visible, vec![key(1, 0), key(2, 0)]);
    }

    #[test]
    fn test_scan_missing_directory_fails() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone");

        let err = scan_visible(&missing).unwrap_err();
        assert!(matches!(err, crate::QueueError::ListDir { .. }));
    }
}
