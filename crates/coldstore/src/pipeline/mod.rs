//! Command pipelines. Each runs its stages in order and leaves no tracked
//! temporaries behind once it returns.

use std::path::Path;

use coldstore_codec::CompressionEngine;
use coldstore_fs::ResourceTracker;
use coldstore_par2::{Par2Cli, RecoveryBackend};

use crate::config::Config;
use crate::preflight::{Preflight, SystemPreflight};
use crate::progress::{IndicatifProgress, ProgressSink};

pub mod extract;
pub mod pack;
pub mod process;
pub mod repair;
pub mod verify;

pub use extract::{ExtractOptions, ExtractSummary, extract};
pub use pack::{PackOptions, PackSummary, pack};
pub use process::{ProcessOptions, ProcessOutcome, process};
pub use repair::{RepairOptions, RepairOutcome, repair};
pub use verify::verify;

/// Collaborators shared by every pipeline.
pub struct Context {
    pub config:    Config,
    pub tracker:   ResourceTracker,
    pub backend:   Box<dyn RecoveryBackend>,
    pub progress:  Box<dyn ProgressSink>,
    pub preflight: Box<dyn Preflight>,
}

impl Context {
    /// Production collaborators: the `par2` tool, terminal progress and
    /// system resource checks.
    pub fn new(config: Config) -> Self {
        let tracker = ResourceTracker::with_options(config.tracker_options());
        let backend = Box::new(Par2Cli::new(config.par2_settings()));
        Self {
            config,
            tracker,
            backend,
            progress: Box::new(IndicatifProgress::new()),
            preflight: Box::new(SystemPreflight::new()),
        }
    }

    pub fn with_tracker(mut self, tracker: ResourceTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_backend(mut self, backend: impl RecoveryBackend + 'static) -> Self {
        self.backend = Box::new(backend);
        self
    }

    pub fn with_progress(mut self, progress: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn with_preflight(mut self, preflight: impl Preflight + 'static) -> Self {
        self.preflight = Box::new(preflight);
        self
    }

    pub fn engine(&self) -> CompressionEngine { CompressionEngine::new(self.config.compression()) }

    /// Release a tracked temporary, leaving failures to teardown and the sweep.
    pub(crate) fn release(&self, path: &Path) {
        if let Err(err) = self.tracker.release(path) {
            tracing::warn!(path = %path.display(), %err, "temporary not removed, deferred to a later sweep");
        }
    }
}
