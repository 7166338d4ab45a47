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

//! Process-wide `tracing` setup.
//!
//! Console output goes to stderr. Queue payloads printed by command-line
//! tools own stdout, so log lines never interleave with them.

use std::{
    env,
    io::IsTerminal,
    sync::{Arc, Mutex, Once},
};

use bon::Builder;
use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Deserializer, Serialize, de};
use smart_default::SmartDefault;
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::Subscriber;
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter, layer::SubscriberExt, registry::LookupSpan,
};

/// Deserializes a string value, using `Default::default()` if the string is
/// empty.
///
/// # Errors
/// Returns an error if the non-empty string does not parse as `T`.
pub fn empty_string_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let s = String::deserialize(deserializer)?;
    if s.is_empty() {
        Ok(T::default())
    } else {
        T::deserialize(de::value::StrDeserializer::new(&s)).map_err(|e: de::value::Error| {
            de::Error::custom(format!("invalid value, expect empty string, err: {e}"))
        })
    }
}

/// Default directory name for log files.
pub const DEFAULT_LOGGING_DIR: &str = "logs";

/// Prefix of the main rolling log files.
const LOG_FILE_PREFIX: &str = "fsqueue";

/// Prefix of the error-only rolling log files.
const ERR_LOG_FILE_PREFIX: &str = "fsqueue-err";

/// Handle for changing the level filter at runtime.
///
/// Set by the first call to [`init_global_logging`].
pub static RELOAD_HANDLE: OnceCell<tracing_subscriber::reload::Handle<filter::Targets, Registry>> =
    OnceCell::new();

#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
pub enum ReloadError {
    #[snafu(display("Invalid log level filter {filter:?}"))]
    ParseFilter {
        filter: String,
        source: filter::ParseError,
    },

    #[snafu(display("Logging has not been initialized"))]
    NotInitialized,

    #[snafu(display("Failed to swap the log level filter"))]
    Reload {
        source: tracing_subscriber::reload::Error,
    },
}

/// Replaces the level filter installed by [`init_global_logging`].
///
/// # Errors
///
/// Returns an error if `level` does not parse, or if logging was never
/// initialized in this process.
pub fn reload_level(level: &str) -> Result<(), ReloadError> {
    let targets = level
        .parse::<filter::Targets>()
        .context(ParseFilterSnafu { filter: level })?;
    RELOAD_HANDLE
        .get()
        .context(NotInitializedSnafu)?
        .reload(targets)
        .context(ReloadSnafu)?;
    tracing::info!(level, "Log level reloaded");
    Ok(())
}

/// Configuration options for the logging system.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, SmartDefault, Builder)]
#[serde(default)]
pub struct LoggingOptions {
    /// Directory for hourly rotated log files. Empty disables file logging.
    #[default = ""]
    #[builder(default)]
    pub dir: String,

    /// Level filter such as `"info"` or `"info,fsqueue=debug"`. Falls back to
    /// `RUST_LOG`, then to `"info"`.
    pub level: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_default")]
    #[builder(default)]
    pub log_format: LogFormat,

    /// Rotated files kept per prefix.
    #[default = 720]
    #[builder(default = 720)]
    pub max_log_files: usize,

    /// Whether to also write logs to stderr.
    #[default = true]
    #[builder(default = true)]
    pub append_stderr: bool,
}

/// Available log output formats.
#[derive(
    Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize, Default, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable lines.
    #[default]
    Text,
}

/// Initializes stderr logging with default options.
#[must_use]
pub fn init_tracing_subscriber(app_name: &str) -> Vec<WorkerGuard> {
    init_global_logging(app_name, &LoggingOptions::default())
}

/// Initializes file logging for unit and integration tests.
///
/// Reads `UNITTEST_LOG_DIR` (default `/tmp/__unittest_logs`) and
/// `UNITTEST_LOG_LEVEL` (default `debug`). Safe to call from every test.
pub fn init_default_ut_logging() {
    static START: Once = Once::new();

    START.call_once(|| {
        let dir =
            env::var("UNITTEST_LOG_DIR").unwrap_or_else(|_| "/tmp/__unittest_logs".to_string());
        let level = env::var("UNITTEST_LOG_LEVEL").unwrap_or_else(|_| "debug".to_string());

        let opts = LoggingOptions {
            dir: dir.clone(),
            level: Some(level),
            append_stderr: false,
            ..Default::default()
        };
        let guards = init_global_logging("unittest", &opts);
        if let Ok(mut g) = GLOBAL_UT_LOG_GUARD.lock() {
            *g = Some(guards);
        }

        tracing::info!("logs dir = {}", dir);
    });
}

/// Keeps the unit test writers alive for the whole test binary.
static GLOBAL_UT_LOG_GUARD: Lazy<Arc<Mutex<Option<Vec<WorkerGuard>>>>> =
    Lazy::new(|| Arc::new(Mutex::new(None)));

const DEFAULT_LOG_TARGETS: &str = "info";

/// Installs the global subscriber.
///
/// Layers, each optional:
/// - stderr, when `append_stderr` is set
/// - `fsqueue.*` rolling files, when `dir` is set
/// - `fsqueue-err.*` rolling files holding `ERROR` events only, when `dir` is
///   set
///
/// Only the first call has any effect. The returned guards flush the
/// non-blocking writers on drop and must be held until exit.
///
/// # Panics
///
/// Panics if the log directory cannot be used, if the level string does not
/// parse, or if another global subscriber is already installed.
pub fn init_global_logging(app_name: &str, opts: &LoggingOptions) -> Vec<WorkerGuard> {
    static START: Once = Once::new();
    let mut guards = vec![];

    START.call_once(|| {
        LogTracer::init().expect("log tracer must be valid");

        let stderr_logging_layer = if opts.append_stderr {
            let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
            guards.push(guard);
            Some(fmt_layer(
                writer,
                opts.log_format,
                std::io::stderr().is_terminal(),
                filter::LevelFilter::TRACE,
            ))
        } else {
            None
        };

        let file_logging_layer = if opts.dir.is_empty() {
            None
        } else {
            let (writer, guard) = rolling_writer(opts, LOG_FILE_PREFIX);
            guards.push(guard);
            Some(fmt_layer(
                writer,
                opts.log_format,
                false,
                filter::LevelFilter::TRACE,
            ))
        };

        let err_file_logging_layer = if opts.dir.is_empty() {
            None
        } else {
            let (writer, guard) = rolling_writer(opts, ERR_LOG_FILE_PREFIX);
            guards.push(guard);
            Some(fmt_layer(
                writer,
                opts.log_format,
                false,
                filter::LevelFilter::ERROR,
            ))
        };

        let filter = opts
            .level
            .as_deref()
            .or(env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
            .unwrap_or(DEFAULT_LOG_TARGETS)
            .parse::<filter::Targets>()
            .expect("error parsing log level string");

        let (dyn_filter, reload_handle) = tracing_subscriber::reload::Layer::new(filter);

        RELOAD_HANDLE
            .set(reload_handle)
            .expect("reload handle already set, maybe init_global_logging get called twice?");

        let subscriber = Registry::default()
            .with(dyn_filter)
            .with(stderr_logging_layer)
            .with(file_logging_layer)
            .with(err_file_logging_layer);

        tracing::subscriber::set_global_default(subscriber)
            .expect("error setting global tracing subscriber");

        tracing::debug!(app = app_name, pid = std::process::id(), "Logging initialized");
    });

    guards
}

fn rolling_writer(opts: &LoggingOptions, prefix: &str) -> (NonBlocking, WorkerGuard) {
    let rolling_appender = RollingFileAppender::builder()
        .rotation(Rotation::HOURLY)
        .filename_prefix(prefix)
        .max_log_files(opts.max_log_files)
        .build(&opts.dir)
        .unwrap_or_else(|e| {
            panic!(
                "initializing rolling file appender at {} failed: {}",
                &opts.dir, e
            )
        });
    tracing_appender::non_blocking(rolling_appender)
}

fn fmt_layer<S>(
    writer: NonBlocking,
    format: LogFormat,
    ansi: bool,
    max_level: filter::LevelFilter,
) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Json => tracing_subscriber::fmt::Layer::new()
            .json()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(max_level)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::Layer::new()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_filter(max_level)
            .boxed(),
    }
}
