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

//! A queue shared by independent processes through one directory.
//!
//! Each item is a file named by its [`SequenceKey`]. Producers write the file
//! under a `.lock` name and rename it into place; consumers claim an item by
//! renaming it back to the `.lock` name, then read and delete it. Atomic
//! rename is the only synchronization: there are no file locks and no
//! coordinator process.
//!
//! ```text
//! absent ──write──▶ <key>.lock ──rename──▶ <key> ──rename──▶ <key>.lock ──unlink──▶ absent
//!                   (staging)             (visible)         (claimed)
//! ```

mod builder;
mod claim;
pub mod codec;
pub mod config;
pub mod error;
pub mod key;
pub mod metrics;
pub mod path;
mod publish;
mod queue;
mod watch;

pub use builder::QueueBuilder;
pub use codec::{BincodeCodec, BincodeError, Codec, JsonCodec, RawCodec};
pub use config::{FlushMode, QueueConfig};
pub use error::{QueueError, Result};
pub use key::SequenceKey;
pub use queue::{Drain, FileQueue, QueueStats};
