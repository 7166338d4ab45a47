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

use crate::{Codec, FileQueue, FlushMode, JsonCodec, QueueConfig, Result};

pub struct QueueBuilder<C = JsonCodec> {
    config: QueueConfig,
    codec:  C,
}

impl QueueBuilder {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self::from_config(QueueConfig {
            base_path: base_path.into(),
            ..Default::default()
        })
    }

    #[must_use]
    pub const fn from_config(config: QueueConfig) -> Self {
        Self {
            config,
            codec: JsonCodec,
        }
    }
}

impl<C> QueueBuilder<C> {
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn fifo(mut self, fifo: bool) -> Self {
        self.config.fifo = fifo;
        self
    }

    #[must_use]
    pub const fn flush_mode(mut self, mode: FlushMode) -> Self {
        self.config.flush_mode = mode;
        self
    }

    #[must_use]
    pub const fn watch(mut self, watch: bool) -> Self {
        self.config.watch = watch;
        self
    }

    #[must_use]
    pub const fn requeue_on_decode_error(mut self, requeue: bool) -> Self {
        self.config.requeue_on_decode_error = requeue;
        self
    }

    /// Replaces the payload codec.
    pub fn codec<C2>(self, codec: C2) -> QueueBuilder<C2> {
        QueueBuilder {
            config: self.config,
            codec,
        }
    }

    /// Opens the queue for payloads of type `T`.
    ///
    /// # Errors
    ///
    /// See [`FileQueue::open`].
    pub fn build<T>(self) -> Result<FileQueue<T, C>>
    where
        C: Codec<T>,
    {
        FileQueue::open(self.config, self.codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BincodeCodec;

    #[test]
    fn test_builder_default_config() {
        let builder = QueueBuilder::new("/tmp/test_queue");
        assert_eq!(builder.config.base_path, PathBuf::from("/tmp/test_queue"));
        assert_eq!(builder.config.poll_interval, Duration::from_millis(100));
        assert!(builder.config.fifo);
        assert_eq!(builder.config.flush_mode, FlushMode::Async);
        assert!(!builder.config.watch);
    }

    #[test]
    fn test_builder_custom_config() {
        let builder = QueueBuilder::new("/tmp/test_queue")
            .poll_interval(Duration::from_millis(5))
            .fifo(false)
            .flush_mode(FlushMode::Sync)
            .watch(true)
            .requeue_on_decode_error(true)
            .codec(BincodeCodec);

        assert_eq!(builder.config.poll_interval, Duration::from_millis(5));
        assert!(!builder.config.fifo);
        assert_eq!(builder.config.flush_mode, FlushMode::Sync);
        assert!(builder.config.watch);
        assert!(builder.config.requeue_on_decode_error);
    }

    #[test]
    fn test_build_with_bincode() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let queue = QueueBuilder::new(temp_dir.path())
            .codec(BincodeCodec)
            .build::<(u32, String)>()
            .unwrap();

        queue.put(&(3, "three".to_string())).unwrap();
        assert_eq!(queue.get().unwrap(), (3, "three".to_string()));
    }
}
