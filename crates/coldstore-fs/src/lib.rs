//! Crash- and signal-safe handling of the temporary paths a coldstore run creates.
//!
//! # Architecture
//!
//! - `retry.rs` - Bounded retry combinator with pluggable backoff
//! - `remove.rs` - File/directory removal tolerant of transient locks
//! - `tracker.rs` - `ResourceTracker`: temp allocation, release, at-most-once teardown
//! - `sweep.rs` - Startup sweep of stale prefixed temporaries
//! - `signal.rs` - SIGINT/SIGTERM routing into teardown
//! - `atomic.rs` - Write-then-rename for small output files

pub use atomic::atomic_write;
pub use error::{Error, Result};
pub use remove::{remove_dir, remove_dir_best_effort, remove_file};
pub use retry::{Backoff, RetryPolicy, retry, retry_with};
pub use signal::install_signal_hooks;
pub use sweep::{SweepReport, sweep_orphans};
pub use tracker::{
    DEFAULT_ORPHAN_AGE, DEFAULT_PREFIX, ResourceKind, ResourceTracker, TeardownGuard, TeardownReport,
    TrackedResource, TrackerOptions,
};

mod atomic;
mod error;
mod remove;
mod retry;
mod signal;
mod sweep;
mod tracker;
