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

//! Panics reported as `tracing` events.

use std::{panic, sync::LazyLock};

use backtrace::Backtrace;
use prometheus::{IntCounter, register_int_counter};

/// Panics observed since process start.
pub static PANIC_COUNTER: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("fsqueue_panic_total", "Panics observed by the panic hook").unwrap()
});

/// Chains a hook in front of the current one that logs the panic message,
/// location and backtrace at `ERROR` and bumps [`PANIC_COUNTER`].
///
/// A panic in a consumer between claim and delete leaves the item at its
/// `.lock` path; the logged location is what an operator needs to decide
/// whether to rename it back.
pub fn set_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic| {
        let backtrace = format!("{:?}", Backtrace::new());
        if let Some(location) = panic.location() {
            tracing::error!(
                message = %panic,
                backtrace = %backtrace,
                panic.file = location.file(),
                panic.line = location.line(),
                panic.column = location.column(),
            );
        } else {
            tracing::error!(message = %panic, backtrace = %backtrace);
        }
        PANIC_COUNTER.inc();
        default_hook(panic);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_hook_counts_panics() {
        set_panic_hook();
        let before = PANIC_COUNTER.get();

        let result = std::panic::catch_unwind(|| panic!("boom"));

        assert!(result.is_err());
        assert!(PANIC_COUNTER.get() > before);
    }
}
