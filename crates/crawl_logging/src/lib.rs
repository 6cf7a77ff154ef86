#![deny(missing_docs)]
//! Shared logging utilities for the crawl workspace.
//!
//! This crate provides the `crawl_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every message is
//! tagged with the checkpoint batch the crawl is currently working on, so a
//! log file can be lined up against the `*_partial_{n}.json` checkpoints.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Batch number owned by one crawl; 0 means "outside any batch".
///
/// The coordinator updates its own tag and runs its work inside
/// [`with_batch_tag`], so concurrent crawls in one process keep separate tags.
#[derive(Debug, Default)]
pub struct BatchTag(AtomicU64);

impl BatchTag {
    /// Records the batch the owning crawl is working on.
    pub fn set(&self, batch: u64) {
        self.0.store(batch, Ordering::Relaxed);
    }

    /// Returns the recorded batch.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

tokio::task_local! {
    static BATCH_TAG: Arc<BatchTag>;
}

/// Runs `fut` with `tag` attached to every `crawl_*` message it logs.
/// Spawned tasks do not inherit the tag and must be wrapped themselves.
pub async fn with_batch_tag<F: Future>(tag: Arc<BatchTag>, fut: F) -> F::Output {
    BATCH_TAG.scope(tag, fut).await
}

/// Returns the batch of the enclosing scope, or 0 outside of one.
pub fn current_batch() -> u64 {
    BATCH_TAG.try_with(|tag| tag.get()).unwrap_or(0)
}

/// Formats the batch tag prefixed to every message, e.g. `[batch 3] `.
#[doc(hidden)]
pub fn batch_tag() -> String {
    match current_batch() {
        0 => String::new(),
        n => format!("[batch {n}] "),
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! crawl_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::batch_tag(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! crawl_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::batch_tag(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! crawl_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::batch_tag(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! crawl_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::batch_tag(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! crawl_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::batch_tag(), format_args!($($arg)*));
    }};
}

/// Initializes a terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Keep dependency chatter (hyper, wiremock) out of test output.
    let config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("wiremock")
        .add_filter_ignore_str("reqwest")
        .build();

    // Ignore the error if a logger was already set by another test.
    let _ = TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto);
}
