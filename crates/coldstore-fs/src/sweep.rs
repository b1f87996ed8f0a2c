use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::remove::{remove_dir_best_effort, remove_file};
use crate::retry::RetryPolicy;

#[derive(Debug, Default)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
    pub failed:  Vec<PathBuf>,
}

/// Remove entries directly under `root` whose name starts with `prefix` and
/// whose modification time is older than `max_age`.
pub fn sweep_orphans(root: &Path, prefix: &str, max_age: Duration, policy: &RetryPolicy) -> SweepReport {
    let mut report = SweepReport::default();
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(root = %root.display(), %err, "orphan sweep skipped");
            return report;
        }
    };

    let now = SystemTime::now();
    for entry in entries.flatten() {
        if !entry.file_name().to_string_lossy().starts_with(prefix) {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        let age = meta
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age <= max_age {
            continue;
        }

        let path = entry.path();
        let removed = if meta.is_dir() {
            remove_dir_best_effort(&path, policy).is_empty()
        } else {
            remove_file(&path, policy).is_ok()
        };
        if removed {
            tracing::info!(path = %path.display(), age_secs = age.as_secs(), "removed orphaned temporary");
            report.removed.push(path);
        } else {
            tracing::warn!(path = %path.display(), "could not remove orphaned temporary");
            report.failed.push(path);
        }
    }
    report
}
