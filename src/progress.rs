//! Progress reporting surface, decoupled from rendering.

use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Handle identifying a registered task in a sink.
pub type TaskId = usize;

/// Receives per-job byte counts. Each job updates only its own task, so
/// implementations never see cross-job write contention on a single entry.
pub trait ProgressSink: Send + Sync {
    /// Register a new task; the returned id keys later updates.
    fn register(&self, description: &str, total_bytes: u64) -> TaskId;

    /// Publish the cumulative absolute byte count for a task.
    fn set_completed(&self, task: TaskId, completed_bytes: u64);
}

/// Renders one `indicatif` bar per task on stderr.
pub struct MultiProgressSink {
    multi: MultiProgress,
    bars: Mutex<Vec<ProgressBar>>,
}

impl MultiProgressSink {
    pub fn new() -> Self {
        let multi = MultiProgress::new();
        // Draw even when stderr is redirected to a file.
        multi.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));
        Self {
            multi,
            bars: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MultiProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for MultiProgressSink {
    fn register(&self, description: &str, total_bytes: u64) -> TaskId {
        let pb = self.multi.add(ProgressBar::new(total_bytes));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes:>12}/{total_bytes:<12} {bytes_per_sec:>12} {eta:>4} {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb.set_message(format!("Downloading {}", description));
        let mut bars = self.bars.lock().unwrap();
        bars.push(pb);
        bars.len() - 1
    }

    fn set_completed(&self, task: TaskId, completed_bytes: u64) {
        let bars = self.bars.lock().unwrap();
        if let Some(pb) = bars.get(task) {
            pb.set_position(completed_bytes);
            if pb.length().is_some_and(|len| completed_bytes >= len) {
                pb.finish();
            }
        }
    }
}
