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

//! Benchmarks for the filesystem queue.
//!
//! Measures:
//! - Put latency at different payload sizes
//! - Put/get round trip with and without fsync
//! - `qsize` and claim cost on a populated directory

use std::{hint::black_box, time::Duration};

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fsqueue::{FileQueue, FlushMode, QueueBuilder, RawCodec};
use tempfile::TempDir;

/// Payload sizes to benchmark (bytes)
const PAYLOAD_SIZES: &[usize] = &[64, 1024, 16384];

/// Items pre-populated for the directory scan benchmarks
const POPULATED_SIZES: &[usize] = &[100, 1_000, 10_000];

fn create_queue(temp_dir: &TempDir, flush_mode: FlushMode) -> FileQueue<Vec<u8>, RawCodec> {
    QueueBuilder::new(temp_dir.path())
        .poll_interval(Duration::from_millis(1))
        .flush_mode(flush_mode)
        .codec(RawCodec)
        .build()
        .expect("Failed to create queue")
}

fn generate_payload(size: usize) -> Vec<u8> { vec![0xAB_u8; size] }

// =============================================================================
// Put Latency
// =============================================================================

fn bench_put_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_latency");

    for &size in PAYLOAD_SIZES {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let queue = create_queue(&temp_dir, FlushMode::Async);
            let payload = generate_payload(size);

            b.iter(|| {
                queue.put(black_box(&payload)).unwrap();
            });
        });
    }

    group.finish();
}

// =============================================================================
// Round Trip
// =============================================================================

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");

    for (name, flush_mode) in [("async", FlushMode::Async), ("sync", FlushMode::Sync)] {
        if flush_mode == FlushMode::Sync {
            // fsync per put is slow
            group.sample_size(20);
        }
        group.bench_function(name, |b| {
            let temp_dir = TempDir::new().unwrap();
            let queue = create_queue(&temp_dir, flush_mode);
            let payload = generate_payload(256);

            b.iter(|| {
                queue.put(&payload).unwrap();
                black_box(queue.get().unwrap());
            });
        });
    }

    group.finish();
}

// =============================================================================
// Populated Directory
// =============================================================================

fn bench_qsize(c: &mut Criterion) {
    let mut group = c.benchmark_group("qsize");

    for &items in POPULATED_SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(items), &items, |b, &items| {
            let temp_dir = TempDir::new().unwrap();
            let queue = create_queue(&temp_dir, FlushMode::Async);
            for _ in 0..items {
                queue.put(&generate_payload(16)).unwrap();
            }

            b.iter(|| black_box(queue.qsize().unwrap()));
        });
    }

    group.finish();
}

fn bench_try_get_populated(c: &mut Criterion) {
    let mut group = c.benchmark_group("try_get_populated");
    group.sample_size(20);

    for &items in POPULATED_SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(items), &items, |b, &items| {
            b.iter_batched(
                || {
                    let temp_dir = TempDir::new().unwrap();
                    let queue = create_queue(&temp_dir, FlushMode::Async);
                    for _ in 0..items {
                        queue.put(&generate_payload(16)).unwrap();
                    }
                    (temp_dir, queue)
                },
                |(temp_dir, queue)| {
                    black_box(queue.try_get().unwrap());
                    drop(temp_dir);
                },
                BatchSize::PerIteration,
            );
        });
    }

    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(
    benches,
    bench_put_latency,
    bench_round_trip,
    bench_qsize,
    bench_try_get_populated,
);

criterion_main!(benches);
