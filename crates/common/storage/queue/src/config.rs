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

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Options for a [`FileQueue`](crate::FileQueue).
///
/// Deserializes from any serde format; `poll_interval` uses humantime
/// notation such as `"250ms"` or `"2s"`. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SmartDefault)]
#[serde(default)]
pub struct QueueConfig {
    /// Directory holding the item files. Created on open if absent.
    #[default(_code = "PathBuf::from(\"./queue_data\")")]
    pub base_path: PathBuf,

    /// Sleep between scans while no item is claimable.
    #[default(_code = "Duration::from_millis(100)")]
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// `true` claims the oldest key first, `false` the newest.
    #[default = true]
    pub fifo: bool,

    /// Durability of staging writes.
    pub flush_mode: FlushMode,

    /// Wake blocked consumers on directory change notifications instead of
    /// waiting out the full poll interval.
    #[default = false]
    pub watch: bool,

    /// On a decode failure, rename the claimed file back to its visible name
    /// before returning the error.
    #[default = false]
    pub requeue_on_decode_error: bool,
}

/// How staging files reach the disk before they are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// Leave flushing to the OS.
    #[default]
    Async,
    /// `fsync` each staging file before the publish rename.
    Sync,
}
