use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::upload::ProgressReporter;

const BAR_WIDTH: usize = 30;

/// Renders upload progress as a single rewritten line on stderr.
#[derive(Default)]
pub struct ConsoleReporter {
    name: Mutex<String>,
    pending: AtomicUsize,
}

impl ConsoleReporter {
    fn current_name(&self) -> String {
        self.name
            .lock()
            .map(|name| name.clone())
            .unwrap_or_default()
    }
}

impl ProgressReporter for ConsoleReporter {
    fn show(&self, name: &str) {
        if let Ok(mut current) = self.name.lock() {
            *current = name.to_string();
        }
        eprintln!();
    }

    fn set_progress(&self, percentage: f64) {
        eprint!(
            "\r{}",
            progress_line(
                &self.current_name(),
                percentage,
                self.pending.load(Ordering::Relaxed)
            )
        );
    }

    fn set_pending_count(&self, count: usize) {
        self.pending.store(count, Ordering::Relaxed);
    }

    fn hide(&self) {
        eprintln!();
    }
}

fn progress_line(name: &str, percentage: f64, pending: usize) -> String {
    let percentage = percentage.clamp(0.0, 100.0);
    let filled = ((percentage / 100.0) * BAR_WIDTH as f64) as usize;
    format!(
        "[{}{}] {:5.1}% {} ({} pending)",
        "=".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        percentage,
        name,
        pending
    )
}
