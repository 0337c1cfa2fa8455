pub mod progress;
pub mod queue;
pub mod source;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use progress::{ProgressReporter, SilentReporter};
pub use queue::{QueueError, QueueEvent, UploadConfig, UploadQueue, UploadWorker, upload_queue};
pub use source::{UploadFile, UploadSource};
pub use task::{UploadApi, UploadError, UploadStatus, UploadTask};
