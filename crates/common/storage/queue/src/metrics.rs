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

use std::sync::LazyLock;

use prometheus::{IntCounter, register_int_counter};

pub static QUEUE_PUT: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("fsqueue_put_total", "Total number of items published").unwrap()
});

pub static QUEUE_GET: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("fsqueue_get_total", "Total number of items claimed and read").unwrap()
});

pub static QUEUE_CLAIM_RACE_LOST: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "fsqueue_claim_race_lost_total",
        "Total number of claim renames lost to another consumer"
    )
    .unwrap()
});

pub static QUEUE_KEY_COLLISION: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "fsqueue_key_collision_total",
        "Total number of sequence keys regenerated after a name collision"
    )
    .unwrap()
});

pub static QUEUE_POLL_WAIT: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "fsqueue_poll_wait_total",
        "Total number of waits on an empty queue"
    )
    .unwrap()
});

pub static QUEUE_REQUEUED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "fsqueue_requeued_total",
        "Total number of undecodable items returned to the queue"
    )
    .unwrap()
});
