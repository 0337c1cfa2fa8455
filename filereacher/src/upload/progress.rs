/// Sink for upload status. Implementations render; they hold no queue logic.
pub trait ProgressReporter: Send + Sync {
    fn show(&self, name: &str);
    /// Percentage in `0.0..=100.0`.
    fn set_progress(&self, percentage: f64);
    fn set_pending_count(&self, count: usize);
    fn hide(&self);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn show(&self, _name: &str) {}

    fn set_progress(&self, _percentage: f64) {}

    fn set_pending_count(&self, _count: usize) {}

    fn hide(&self) {}
}
