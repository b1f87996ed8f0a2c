use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use once_cell::sync::Lazy;

/// Handle returned by [`ProgressSink::add_task`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskId(usize);

/// Named tasks with optional byte totals. Implementations never block the
/// caller on rendering.
pub trait ProgressSink {
    fn add_task(&self, name: &str, total: Option<u64>) -> TaskId;
    fn advance(&self, task: TaskId, delta: u64);
    fn complete(&self, task: TaskId);
}

const BAR_STYLE: &str =
    "{spinner:.blue} {msg:<14} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

const SPINNER_STYLE: &str = "{spinner:.blue} {msg:<14} [{elapsed_precise}] {bytes} ({bytes_per_sec})";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const BAR_CHARS: &str = "█▓▒░  ";

static BAR_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    ProgressStyle::with_template(BAR_STYLE)
        .ok()
        .map(|style| style.tick_chars(TICK).progress_chars(BAR_CHARS))
});

static SPINNER_TEMPLATE: Lazy<Option<ProgressStyle>> =
    Lazy::new(|| ProgressStyle::with_template(SPINNER_STYLE).ok().map(|style| style.tick_chars(TICK)));

/// Terminal progress bars on stderr.
pub struct IndicatifProgress {
    multi: MultiProgress,
    bars:  Mutex<Vec<ProgressBar>>,
}

impl IndicatifProgress {
    pub fn new() -> Self { Self::with_target(ProgressDrawTarget::stderr()) }

    /// Bars that track state but draw nothing.
    pub fn hidden() -> Self { Self::with_target(ProgressDrawTarget::hidden()) }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars:  Mutex::new(Vec::new()),
        }
    }

    fn bar(&self, task: TaskId) -> Option<ProgressBar> {
        self.bars.lock().ok()?.get(task.0).cloned()
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self { Self::new() }
}

impl ProgressSink for IndicatifProgress {
    fn add_task(&self, name: &str, total: Option<u64>) -> TaskId {
        let (bar, style) = match total {
            Some(len) => (ProgressBar::new(len), BAR_TEMPLATE.as_ref()),
            None => (ProgressBar::no_length(), SPINNER_TEMPLATE.as_ref()),
        };
        if let Some(style) = style {
            bar.set_style(style.clone());
        }
        bar.set_message(name.to_string());
        let bar = self.multi.add(bar);

        let Ok(mut bars) = self.bars.lock() else {
            return TaskId(usize::MAX);
        };
        bars.push(bar);
        TaskId(bars.len() - 1)
    }

    fn advance(&self, task: TaskId, delta: u64) {
        if let Some(bar) = self.bar(task) {
            bar.inc(delta);
        }
    }

    fn complete(&self, task: TaskId) {
        if let Some(bar) = self.bar(task) {
            bar.finish();
        }
    }
}

/// Discards all progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn add_task(&self, _name: &str, _total: Option<u64>) -> TaskId { TaskId(0) }

    fn advance(&self, _task: TaskId, _delta: u64) {}

    fn complete(&self, _task: TaskId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_parse() {
        assert!(BAR_TEMPLATE.is_some());
        assert!(SPINNER_TEMPLATE.is_some());
    }

    #[test]
    fn hidden_bars_track_position() {
        let progress = IndicatifProgress::hidden();
        let first = progress.add_task("compress", Some(100));
        let second = progress.add_task("hash", None);
        assert_ne!(first, second);

        progress.advance(first, 40);
        progress.advance(first, 2);
        assert_eq!(progress.bar(first).unwrap().position(), 42);

        progress.complete(first);
        assert!(progress.bar(first).unwrap().is_finished());
        assert!(!progress.bar(second).unwrap().is_finished());
    }
}
