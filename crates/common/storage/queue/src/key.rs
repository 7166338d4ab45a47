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

//! Sequence keys: the sortable names of queue item files.
//!
//! ```text
//! 1760784000123456-0042
//! └──────┬───────┘ └┬─┘
//!  µs since epoch   random tie-breaker
//!  (16 digits)      (4 digits)
//! ```
//!
//! Both parts are zero padded so that the lexicographic order of file names
//! equals the numeric order of `(timestamp, tiebreak)`. Keys generated more
//! than one microsecond apart sort in generation order; keys generated within
//! the same microsecond sort randomly.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rand::Rng;
use snafu::{Snafu, ensure};

/// Digits in the timestamp component.
pub const TIMESTAMP_WIDTH: usize = 16;

/// Digits in the tie-breaker component.
pub const TIEBREAK_WIDTH: usize = 4;

/// Exclusive upper bound of the tie-breaker.
pub const TIEBREAK_RANGE: u16 = 10_000;

const TIMESTAMP_LIMIT: u64 = 10_u64.pow(TIMESTAMP_WIDTH as u32);
const KEY_LEN: usize = TIMESTAMP_WIDTH + 1 + TIEBREAK_WIDTH;

/// A name that is not a sequence key.
#[derive(Snafu, Debug, Clone, PartialEq, Eq)]
#[snafu(display("Not a sequence key: {name:?}"))]
pub struct ParseKeyError {
    name: String,
}

/// Identifies one queue item and fixes its position in the ordering.
///
/// The derived `Ord` compares the timestamp first and the tie-breaker second,
/// which is the same order as the rendered file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceKey {
    timestamp: u64,
    tiebreak:  u16,
}

impl SequenceKey {
    /// Build a key from its parts. Returns `None` when either part does not
    /// fit its fixed width.
    #[must_use]
    pub const fn new(timestamp: u64, tiebreak: u16) -> Option<Self> {
        if timestamp >= TIMESTAMP_LIMIT || tiebreak >= TIEBREAK_RANGE {
            return None;
        }
        Some(Self {
            timestamp,
            tiebreak,
        })
    }

    /// A fresh key for the current instant with a random tie-breaker.
    #[must_use]
    pub fn now() -> Self {
        let micros = u64::try_from(Utc::now().timestamp_micros()).unwrap_or_default();
        Self {
            timestamp: micros % TIMESTAMP_LIMIT,
            tiebreak:  rand::thread_rng().gen_range(0..TIEBREAK_RANGE),
        }
    }

    /// Microseconds since the Unix epoch.
    #[must_use]
    pub const fn timestamp(&self) -> u64 { self.timestamp }

    #[must_use]
    pub const fn tiebreak(&self) -> u16 { self.tiebreak }

    /// Wall-clock time the key was generated at.
    #[must_use]
    pub fn enqueued_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp)
            .ok()
            .and_then(DateTime::from_timestamp_micros)
    }
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:0tw$}-{:0bw$}",
            self.timestamp,
            self.tiebreak,
            tw = TIMESTAMP_WIDTH,
            bw = TIEBREAK_WIDTH
        )
    }
}

impl FromStr for SequenceKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == KEY_LEN
            && bytes[TIMESTAMP_WIDTH] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == TIMESTAMP_WIDTH || b.is_ascii_digit());
        ensure!(well_formed, ParseKeySnafu { name: s });

        let (timestamp, tiebreak) = s.split_at(TIMESTAMP_WIDTH);
        let timestamp = timestamp.parse().ok();
        let tiebreak = tiebreak[1..].parse().ok();
        match (timestamp, tiebreak) {
            (Some(timestamp), Some(tiebreak)) => Ok(Self {
                timestamp,
                tiebreak,
            }),
            _ => ParseKeySnafu { name: s }.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_display_is_zero_padded() {
        let key = SequenceKey::new(42, 7).unwrap();
        assert_eq!(key.to_string(), "0000000000000042-0007");
    }

    #[test]
    fn test_parse_display_form() {
        let key: SequenceKey = "1760784000123456-0042".parse().unwrap();
        assert_eq!(key.timestamp(), 1_760_784_000_123_456);
        assert_eq!(key.tiebreak(), 42);
        assert_eq!(key.to_string(), "1760784000123456-0042");
    }

    #[test_case("" ; "empty")]
    #[test_case("1760784000123456-0042.lock" ; "claimed suffix")]
    #[test_case("1760784000123456_0042" ; "wrong separator")]
    #[test_case("176078400012345-00042" ; "misplaced separator")]
    #[test_case("17607840001234x6-0042" ; "non digit")]
    #[test_case("+760784000123456-0042" ; "sign")]
    #[test_case("README.md" ; "foreign file")]
    fn test_parse_rejects(name: &str) {
        assert!(name.parse::<SequenceKey>().is_err());
    }

    #[test]
    fn test_new_rejects_overflowing_parts() {
        assert!(SequenceKey::new(TIMESTAMP_LIMIT, 0).is_none());
        assert!(SequenceKey::new(0, TIEBREAK_RANGE).is_none());
        assert!(SequenceKey::new(TIMESTAMP_LIMIT - 1, TIEBREAK_RANGE - 1).is_some());
    }

    #[test]
    fn test_order_matches_name_order() {
        let keys = [
            SequenceKey::new(9, 9999).unwrap(),
            SequenceKey::new(10, 0).unwrap(),
            SequenceKey::new(10, 1).unwrap(),
            SequenceKey::new(1_000_000, 5).unwrap(),
        ];
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].to_string() < pair[1].to_string());
        }
    }

    #[test]
    fn test_now_is_recent_and_in_range() {
        let before = Utc::now();
        let key = SequenceKey::now();
        let at = key.enqueued_at().unwrap();

        assert!(key.tiebreak() < TIEBREAK_RANGE);
        assert!(at >= before - chrono::Duration::seconds(1));
        assert!(at <= Utc::now() + chrono::Duration::seconds(1));
    }

    #[test]
    fn test_keys_further_apart_than_a_tick_are_ordered() {
        let first = SequenceKey::now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = SequenceKey::now();
        assert!(first < second);
    }
}
