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

use std::{io::BufRead, path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use fsqueue::{FileQueue, FlushMode, QueueBuilder};
use fsqueue_common_telemetry::{LoggingOptions, init_global_logging, set_panic_hook};
use humantime_serde::re::humantime::{format_duration, parse_duration};
use snafu::{ResultExt, Whatever, ensure_whatever, whatever};
use tokio_util::sync::CancellationToken;
use tracing::info;

mod build_info;

#[derive(Debug, Parser)]
#[clap(
name = "fsq",
about = "Multi-process queue in a directory",
author = build_info::AUTHOR,
version = build_info::FULL_VERSION,
long_version = build_info::LONG_VERSION)]
struct Cli {
    #[command(flatten)]
    queue: QueueArgs,

    /// Log level filter, e.g. `debug` or `info,fsqueue=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also write rolling log files into this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    commands: Commands,
}

/// Options shared by every subcommand that opens the queue.
#[derive(Debug, Clone, Args)]
struct QueueArgs {
    /// Queue directory, created if missing.
    #[arg(long, env = "FSQ_ROOT", default_value = "./queue_data", global = true)]
    root: PathBuf,

    /// Wait between scans of an empty queue.
    #[arg(long, value_parser = parse_duration, default_value = "100ms", global = true)]
    poll_interval: Duration,

    /// Claim the newest item first.
    #[arg(long, global = true)]
    lifo: bool,

    /// Wake waiting consumers on directory events instead of polling only.
    #[arg(long, global = true)]
    watch: bool,

    /// fsync each item before publishing it.
    #[arg(long, global = true)]
    sync: bool,
}

impl QueueArgs {
    fn open(&self) -> Result<FileQueue<String>, Whatever> {
        let flush_mode = if self.sync {
            FlushMode::Sync
        } else {
            FlushMode::Async
        };
        QueueBuilder::new(&self.root)
            .poll_interval(self.poll_interval)
            .fifo(!self.lifo)
            .watch(self.watch)
            .flush_mode(flush_mode)
            .build()
            .with_whatever_context(|_| format!("failed to open queue at {}", self.root.display()))
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    Put(PutArgs),
    Get(GetArgs),
    Size(SizeArgs),
    Drain(DrainArgs),
    Demo(DemoArgs),
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Enqueue items and print the key each was published under.
Examples:

fsq put 'resize 42' 'resize 43'
tail -f jobs.txt | fsq put --stdin

")]
struct PutArgs {
    /// Items to enqueue, one per argument.
    #[arg(required_unless_present = "stdin", conflicts_with = "stdin")]
    items: Vec<String>,

    /// Enqueue each line read from stdin.
    #[arg(long)]
    stdin: bool,
}

impl PutArgs {
    fn run(&self, queue: &FileQueue<String>) -> Result<(), Whatever> {
        if self.stdin {
            for line in std::io::stdin().lock().lines() {
                let line = line.whatever_context("failed to read stdin")?;
                put_one(queue, &line)?;
            }
        } else {
            for item in &self.items {
                put_one(queue, item)?;
            }
        }
        Ok(())
    }
}

fn put_one(queue: &FileQueue<String>, item: &str) -> Result<(), Whatever> {
    let key = queue
        .put(&item.to_owned())
        .whatever_context("failed to put item")?;
    println!("{key}");
    Ok(())
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Dequeue one item and print it, waiting while the queue is empty.
Ctrl-C stops the wait without consuming anything.
Examples:

fsq get
fsq get --timeout 5s

")]
struct GetArgs {
    /// Give up after this long.
    #[arg(long, value_parser = parse_duration)]
    timeout: Option<Duration>,
}

impl GetArgs {
    async fn run(&self, queue: &FileQueue<String>) -> Result<(), Whatever> {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        ctrlc::set_handler(move || on_interrupt.cancel())
            .whatever_context("failed to install Ctrl-C handler")?;

        let item = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, queue.get_async(&cancel)).await
            {
                Ok(result) => result,
                Err(_) => whatever!("no item arrived within {}", format_duration(timeout)),
            },
            None => queue.get_async(&cancel).await,
        }
        .whatever_context("failed to get item")?;

        match item {
            Some(item) => {
                println!("{item}");
                Ok(())
            }
            None => whatever!("interrupted while waiting for an item"),
        }
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Print the number of items waiting in the queue. Items being written or
consumed right now are not counted.
Examples:

fsq size
FSQ_ROOT=/var/spool/jobs fsq size

")]
struct SizeArgs {
    /// Also print claimed and staging files.
    #[arg(long)]
    verbose: bool,
}

impl SizeArgs {
    fn run(&self, queue: &FileQueue<String>) -> Result<(), Whatever> {
        if self.verbose {
            let stats = queue.stats().whatever_context("failed to list queue")?;
            println!("visible: {}", stats.visible);
            println!("claimed: {}", stats.claimed);
        } else {
            let size = queue.qsize().whatever_context("failed to list queue")?;
            println!("{size}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Dequeue and print every item available right now, then exit.
Examples:

fsq drain > backlog.txt

")]
struct DrainArgs {}

impl DrainArgs {
    fn run(&self, queue: &FileQueue<String>) -> Result<(), Whatever> {
        let mut count = 0_usize;
        for item in queue.drain() {
            let item = item.whatever_context("failed to drain queue")?;
            println!("{item}");
            count += 1;
        }
        info!(count, "Drained queue");
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r#"

Enqueue "data 0" through "data 9", check the size, then dequeue all ten
and check they come back in order. Needs an empty queue directory.
Examples:

fsq --root /tmp/fsq-demo demo

"#)]
struct DemoArgs {}

impl DemoArgs {
    const ITEMS: usize = 10;

    fn run(&self, queue: &FileQueue<String>) -> Result<(), Whatever> {
        ensure_whatever!(
            queue.is_empty().whatever_context("failed to list queue")?,
            "demo needs an empty queue, {} has items",
            queue.root().display()
        );

        for i in 0..Self::ITEMS {
            let key = queue
                .put(&format!("data {i}"))
                .whatever_context("failed to put item")?;
            println!("put data {i} as {key}");
        }

        let size = queue.qsize().whatever_context("failed to list queue")?;
        ensure_whatever!(
            size == Self::ITEMS,
            "expected {} items, found {size}",
            Self::ITEMS
        );
        println!("size {size}");

        for i in 0..Self::ITEMS {
            let item = queue.get().whatever_context("failed to get item")?;
            ensure_whatever!(
                item == format!("data {i}"),
                "expected data {i}, got {item}"
            );
            println!("got {item}");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Whatever> {
    let cli = Cli::parse();

    let logging_opts = LoggingOptions {
        dir: cli
            .log_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_default(),
        level: cli.log_level.clone(),
        ..Default::default()
    };
    let _guards = init_global_logging("fsq", &logging_opts);
    set_panic_hook();

    let queue = cli.queue.open()?;
    match cli.commands {
        Commands::Put(pa) => pa.run(&queue),
        Commands::Get(ga) => ga.run(&queue).await,
        Commands::Size(sa) => sa.run(&queue),
        Commands::Drain(da) => da.run(&queue),
        Commands::Demo(da) => da.run(&queue),
    }
}
