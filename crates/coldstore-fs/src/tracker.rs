use std::env;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::remove::{remove_dir_best_effort, remove_file};
use crate::retry::RetryPolicy;
use crate::sweep::{SweepReport, sweep_orphans};

pub const DEFAULT_PREFIX: &str = "coldstore_";
pub const DEFAULT_ORPHAN_AGE: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Directory,
}

/// A temporary path owned by exactly one tracker until released or reclaimed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedResource {
    pub path: PathBuf,
    pub kind: ResourceKind,
}

#[derive(Clone, Debug)]
pub struct TrackerOptions {
    prefix:      String,
    temp_root:   PathBuf,
    orphan_age:  Duration,
    file_policy: RetryPolicy,
    dir_policy:  RetryPolicy,
}

impl Default for TrackerOptions {
    fn default() -> Self { Self::new() }
}

impl TrackerOptions {
    pub fn new() -> Self {
        Self {
            prefix:      DEFAULT_PREFIX.to_string(),
            temp_root:   env::temp_dir(),
            orphan_age:  DEFAULT_ORPHAN_AGE,
            file_policy: RetryPolicy::file_removal(),
            dir_policy:  RetryPolicy::dir_removal(),
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    pub fn orphan_age(mut self, age: Duration) -> Self {
        self.orphan_age = age;
        self
    }

    pub fn file_policy(mut self, policy: RetryPolicy) -> Self {
        self.file_policy = policy;
        self
    }

    pub fn dir_policy(mut self, policy: RetryPolicy) -> Self {
        self.dir_policy = policy;
        self
    }

    pub fn prefix_str(&self) -> &str { &self.prefix }

    pub fn temp_root_path(&self) -> &Path { &self.temp_root }
}

/// Outcome of a teardown pass.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub removed:   usize,
    pub callbacks: usize,
    pub remaining: Vec<PathBuf>,
    /// Another caller already ran (or is running) teardown.
    pub skipped:   bool,
}

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Active,
    TearingDown,
    Done,
}

struct State {
    phase:     Phase,
    resources: Vec<TrackedResource>,
    callbacks: Vec<(String, Callback)>,
}

struct Inner {
    state:   Mutex<State>,
    settled: Condvar,
    options: TrackerOptions,
}

/// Owns every temporary path a run allocates and removes them exactly once.
///
/// Cloning shares the same underlying registry, so the signal hook and the
/// pipeline observe one set of resources. The registry lock is held only to
/// mutate the lists; all filesystem work happens after it is released.
#[derive(Clone)]
pub struct ResourceTracker {
    inner: Arc<Inner>,
}

impl fmt::Debug for ResourceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ResourceTracker")
            .field("phase", &state.phase)
            .field("resources", &state.resources)
            .field("callbacks", &state.callbacks.len())
            .finish()
    }
}

impl Default for ResourceTracker {
    fn default() -> Self { Self::new() }
}

impl ResourceTracker {
    pub fn new() -> Self { Self::with_options(TrackerOptions::new()) }

    pub fn with_options(options: TrackerOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    phase:     Phase::Active,
                    resources: Vec::new(),
                    callbacks: Vec::new(),
                }),
                settled: Condvar::new(),
                options,
            }),
        }
    }

    pub fn options(&self) -> &TrackerOptions { &self.inner.options }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create and register a temporary directory named `<prefix><label>...`.
    ///
    /// Fails with [`Error::TornDown`] once teardown has begun.
    pub fn temp_dir(&self, label: &str) -> Result<PathBuf> {
        let prefix = format!("{}{}", self.inner.options.prefix, label);
        self.ensure_active(&prefix)?;
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(&self.inner.options.temp_root)
            .map_err(|source| Error::TempCreate {
                prefix: prefix.clone(),
                source,
            })?;
        let path = dir.keep();
        self.admit(path, ResourceKind::Directory, prefix)
    }

    /// Create and register an empty temporary file named `<prefix><label>...<suffix>`.
    pub fn temp_file(&self, label: &str, suffix: &str) -> Result<PathBuf> {
        let prefix = format!("{}{}", self.inner.options.prefix, label);
        self.ensure_active(&prefix)?;
        let file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(suffix)
            .tempfile_in(&self.inner.options.temp_root)
            .map_err(|source| Error::TempCreate {
                prefix: prefix.clone(),
                source,
            })?;
        let (_, path) = file.keep().map_err(|e| Error::TempCreate {
            prefix: prefix.clone(),
            source: e.error,
        })?;
        self.admit(path, ResourceKind::File, prefix)
    }

    fn ensure_active(&self, prefix: &str) -> Result<()> {
        if self.lock().phase == Phase::Active {
            Ok(())
        } else {
            Err(Error::TornDown { prefix: prefix.to_string() })
        }
    }

    /// Track a freshly created path, or delete it again if teardown won the race.
    fn admit(&self, path: PathBuf, kind: ResourceKind, prefix: String) -> Result<PathBuf> {
        {
            let mut state = self.lock();
            if state.phase == Phase::Active {
                tracing::trace!(path = %path.display(), ?kind, "tracking");
                state.resources.push(TrackedResource { path: path.clone(), kind });
                return Ok(path);
            }
        }
        let opts = &self.inner.options;
        match kind {
            ResourceKind::File => {
                if let Err(err) = remove_file(&path, &opts.file_policy) {
                    tracing::warn!(%err, "temporary file created during teardown left behind");
                }
            }
            ResourceKind::Directory => {
                remove_dir_best_effort(&path, &opts.dir_policy);
            }
        }
        Err(Error::TornDown { prefix })
    }

    /// Register a path created elsewhere.
    pub fn track(&self, path: impl Into<PathBuf>, kind: ResourceKind) {
        let path = path.into();
        tracing::trace!(path = %path.display(), ?kind, "tracking");
        let mut state = self.lock();
        if !state.resources.iter().any(|r| r.path == path) {
            state.resources.push(TrackedResource { path, kind });
        }
    }

    /// Stop tracking `path` without touching the filesystem.
    pub fn forget(&self, path: &Path) -> Option<TrackedResource> {
        let mut state = self.lock();
        let idx = state.resources.iter().position(|r| r.path == path)?;
        Some(state.resources.remove(idx))
    }

    /// Remove a tracked resource now. Failure is non-fatal: the path is
    /// untracked either way and left for the orphan sweep.
    pub fn release(&self, path: &Path) -> Result<()> {
        let Some(resource) = self.forget(path) else {
            return Ok(());
        };
        match resource.kind {
            ResourceKind::File => remove_file(&resource.path, &self.inner.options.file_policy),
            ResourceKind::Directory => {
                let remaining = remove_dir_best_effort(&resource.path, &self.inner.options.dir_policy);
                if remaining.is_empty() {
                    Ok(())
                } else {
                    Err(Error::Cleanup { remaining })
                }
            }
        }
    }

    /// Run `callback` during teardown, after temp paths are removed.
    pub fn add_callback(&self, name: impl Into<String>, callback: impl FnOnce() + Send + 'static) {
        self.lock().callbacks.push((name.into(), Box::new(callback)));
    }

    /// Drop every callback registered under `name` without running it.
    pub fn remove_callback(&self, name: &str) -> bool {
        let mut state = self.lock();
        let before = state.callbacks.len();
        state.callbacks.retain(|(n, _)| n != name);
        state.callbacks.len() != before
    }

    pub fn tracked(&self) -> Vec<TrackedResource> { self.lock().resources.clone() }

    pub fn is_torn_down(&self) -> bool { self.lock().phase == Phase::Done }

    /// Remove everything still tracked and run callbacks.
    ///
    /// Runs at most once per tracker. A concurrent caller (a signal arriving
    /// while normal-exit teardown is running) blocks until the first one
    /// finishes and then returns a skipped report.
    pub fn teardown(&self) -> TeardownReport {
        let (resources, callbacks) = {
            let mut state = self.lock();
            match state.phase {
                Phase::Active => {}
                Phase::TearingDown => {
                    while state.phase == Phase::TearingDown {
                        state = self
                            .inner
                            .settled
                            .wait(state)
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                    }
                    return TeardownReport { skipped: true, ..Default::default() };
                }
                Phase::Done => return TeardownReport { skipped: true, ..Default::default() },
            }
            state.phase = Phase::TearingDown;
            (mem::take(&mut state.resources), mem::take(&mut state.callbacks))
        };

        let mut report = TeardownReport::default();
        let opts = &self.inner.options;

        for dir in resources.iter().filter(|r| r.kind == ResourceKind::Directory) {
            let remaining = remove_dir_best_effort(&dir.path, &opts.dir_policy);
            if remaining.is_empty() {
                report.removed += 1;
            } else {
                report.remaining.extend(remaining);
            }
        }
        for file in resources.iter().filter(|r| r.kind == ResourceKind::File) {
            match remove_file(&file.path, &opts.file_policy) {
                Ok(()) => report.removed += 1,
                Err(err) => {
                    tracing::warn!(%err, "temporary file left behind");
                    report.remaining.push(file.path.clone());
                }
            }
        }
        for (name, callback) in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(callback)) {
                Ok(()) => report.callbacks += 1,
                Err(_) => tracing::warn!(callback = %name, "cleanup callback panicked"),
            }
        }

        if report.remaining.is_empty() {
            tracing::debug!(removed = report.removed, callbacks = report.callbacks, "teardown complete");
        } else {
            tracing::warn!(
                removed = report.removed,
                remaining = report.remaining.len(),
                "teardown incomplete, leftovers will be swept on a later run"
            );
        }

        self.lock().phase = Phase::Done;
        self.inner.settled.notify_all();
        report
    }

    /// Sweep stale entries left by an earlier, ungraceful run.
    pub fn sweep_orphans(&self) -> SweepReport {
        let opts = &self.inner.options;
        sweep_orphans(&opts.temp_root, &opts.prefix, opts.orphan_age, &RetryPolicy::orphan_removal())
    }

    /// Teardown on drop; the normal-exit path of a process.
    pub fn guard(&self) -> TeardownGuard { TeardownGuard { tracker: self.clone() } }
}

pub struct TeardownGuard {
    tracker: ResourceTracker,
}

impl Drop for TeardownGuard {
    fn drop(&mut self) { self.tracker.teardown(); }
}
