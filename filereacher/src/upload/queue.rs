use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use filereacher_core::PathToken;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::progress::ProgressReporter;
use super::source::UploadFile;
use super::task::{UploadApi, UploadError, UploadTask};

pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;
/// Upper bound for one chunk; each chunk is buffered in memory whole.
pub const MAX_CHUNK_SIZE: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadConfig {
    pub chunk_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("upload worker has stopped")]
    Closed,
}

#[derive(Debug)]
pub enum QueueEvent {
    Finished {
        name: String,
        result: Result<(), UploadError>,
    },
    /// Nothing is pending or active any more.
    Drained,
}

/// Submission handle. Clones feed the same worker, so concurrent submitters
/// append to one queue.
#[derive(Clone)]
pub struct UploadQueue {
    jobs: mpsc::UnboundedSender<UploadTask>,
    pending: Arc<AtomicUsize>,
    reporter: Arc<dyn ProgressReporter>,
}

impl UploadQueue {
    pub fn submit(&self, file: UploadFile, destination: PathToken) -> Result<(), QueueError> {
        let count = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(name = file.name(), pending = count, "upload queued");
        if self.jobs.send(UploadTask::new(file, destination)).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed);
        }
        self.reporter.set_pending_count(count);
        Ok(())
    }

    /// Submits in iteration order.
    pub fn submit_many<I>(&self, files: I) -> Result<(), QueueError>
    where
        I: IntoIterator<Item = (UploadFile, PathToken)>,
    {
        for (file, destination) in files {
            self.submit(file, destination)?;
        }
        Ok(())
    }

    /// Tasks submitted but not yet `Done` or `Failed`.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Single consumer that runs queued tasks strictly one after another.
pub struct UploadWorker<A> {
    api: A,
    config: UploadConfig,
    jobs: mpsc::UnboundedReceiver<UploadTask>,
    pending: Arc<AtomicUsize>,
    reporter: Arc<dyn ProgressReporter>,
    events: mpsc::UnboundedSender<QueueEvent>,
}

pub fn upload_queue<A: UploadApi>(
    api: A,
    reporter: Arc<dyn ProgressReporter>,
    config: UploadConfig,
) -> (
    UploadQueue,
    UploadWorker<A>,
    mpsc::UnboundedReceiver<QueueEvent>,
) {
    let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    let queue = UploadQueue {
        jobs: jobs_tx,
        pending: pending.clone(),
        reporter: reporter.clone(),
    };
    let worker = UploadWorker {
        api,
        config,
        jobs: jobs_rx,
        pending,
        reporter,
        events: events_tx,
    };
    (queue, worker, events_rx)
}

impl<A: UploadApi> UploadWorker<A> {
    /// Runs until every [`UploadQueue`] handle is dropped.
    pub async fn run(mut self) {
        while let Some(task) = self.jobs.recv().await {
            self.process(task).await;
        }
        debug!("upload worker stopped");
    }

    async fn process(&mut self, mut task: UploadTask) {
        let name = task.file().name().to_string();
        // a failed task is local to itself; the next one still runs
        let result = task
            .run(&self.api, self.reporter.as_ref(), self.config.chunk_size)
            .await;

        // the event is queued before the count drops, so a reader that sees
        // zero pending also sees every outcome
        let _ = self.events.send(QueueEvent::Finished { name, result });
        let remaining = self.pending.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        self.reporter.set_pending_count(remaining);

        if remaining == 0 {
            info!("upload queue drained");
            self.reporter.hide();
            let _ = self.events.send(QueueEvent::Drained);
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
