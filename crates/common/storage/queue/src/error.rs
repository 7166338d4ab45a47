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

use std::{io, path::PathBuf};

use snafu::Snafu;

/// Boxed error produced by a [`Codec`](crate::Codec).
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Queue operation errors.
///
/// Losing a claim race is not represented here: it is a routine outcome of
/// the claim rename and is absorbed inside the consumer loop.
#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
pub enum QueueError {
    /// The queue root could not be created.
    #[snafu(display("Failed to create queue directory {}", path.display()))]
    CreateDir {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// The queue root could not be listed.
    #[snafu(display("Failed to list queue directory {}", path.display()))]
    ListDir {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// Writing the staging file failed. The item was never published.
    #[snafu(display("Failed to write staging file {}", path.display()))]
    Stage {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// Renaming the staging file to its visible name failed.
    #[snafu(display("Failed to publish {}", path.display()))]
    Publish {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// Every generated sequence key collided with an existing file.
    #[snafu(display("No free sequence key after {attempts} attempts"))]
    KeyCollision { attempts: usize },

    /// The codec rejected the payload before anything was written.
    #[snafu(display("Failed to encode payload"))]
    Encode { source: BoxedError },

    /// The claim rename failed for a reason other than a lost race.
    #[snafu(display("Failed to claim {}", path.display()))]
    Claim {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// A claimed file could not be read.
    #[snafu(display("Failed to read claimed file {}", path.display()))]
    ReadClaimed {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// A claimed file could not be removed after reading.
    #[snafu(display("Failed to remove claimed file {}", path.display()))]
    RemoveClaimed {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// The codec could not decode a claimed file.
    #[snafu(display("Failed to decode claimed file {}", path.display()))]
    Decode { path: PathBuf, source: BoxedError },

    /// A claimed file could not be returned to the visible set.
    #[snafu(display("Failed to requeue {}", path.display()))]
    Requeue {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// The directory watcher could not be installed.
    #[snafu(display("Failed to watch queue directory {}", path.display()))]
    Watch {
        path:   PathBuf,
        source: notify::Error,
    },
}

impl QueueError {
    /// Whether the error happened after this consumer won a claim. Unless the
    /// queue requeues on decode failure, such an item is gone.
    #[must_use]
    pub const fn is_post_claim(&self) -> bool {
        matches!(
            self,
            Self::ReadClaimed { .. }
                | Self::RemoveClaimed { .. }
                | Self::Decode { .. }
                | Self::Requeue { .. }
        )
    }
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
