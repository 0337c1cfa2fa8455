use std::future::Future;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use filereacher_core::{
    ErrorKind, FileReacherClient, FileReacherError, PathToken, SessionToken, UploadSession,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::progress::ProgressReporter;
use super::queue::MAX_CHUNK_SIZE;
use super::source::UploadFile;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("uploading {name} failed: {source}")]
    Api {
        name: String,
        #[source]
        source: FileReacherError,
    },
    #[error("reading {name} failed: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl UploadError {
    pub fn name(&self) -> &str {
        match self {
            UploadError::Api { name, .. } | UploadError::Io { name, .. } => name,
        }
    }

    /// Local read failures are reported as transport problems.
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::Api { source, .. } => source.kind(),
            UploadError::Io { .. } => ErrorKind::Transport,
        }
    }
}

/// Server side of the chunked upload protocol.
pub trait UploadApi: Send + Sync {
    fn start_upload(
        &self,
        path: &PathToken,
        size: u64,
    ) -> impl Future<Output = Result<UploadSession, FileReacherError>> + Send;

    fn upload_chunk(
        &self,
        cookie: &SessionToken,
        offset: u64,
        chunk: Bytes,
    ) -> impl Future<Output = Result<(), FileReacherError>> + Send;

    fn complete_upload(
        &self,
        cookie: &SessionToken,
    ) -> impl Future<Output = Result<(), FileReacherError>> + Send;
}

impl UploadApi for FileReacherClient {
    async fn start_upload(
        &self,
        path: &PathToken,
        size: u64,
    ) -> Result<UploadSession, FileReacherError> {
        FileReacherClient::start_upload(self, path, size).await
    }

    async fn upload_chunk(
        &self,
        cookie: &SessionToken,
        offset: u64,
        chunk: Bytes,
    ) -> Result<(), FileReacherError> {
        FileReacherClient::upload_chunk(self, cookie, offset, chunk).await
    }

    async fn complete_upload(&self, cookie: &SessionToken) -> Result<(), FileReacherError> {
        FileReacherClient::complete_upload(self, cookie).await
    }
}

impl<T: UploadApi> UploadApi for Arc<T> {
    fn start_upload(
        &self,
        path: &PathToken,
        size: u64,
    ) -> impl Future<Output = Result<UploadSession, FileReacherError>> + Send {
        (**self).start_upload(path, size)
    }

    fn upload_chunk(
        &self,
        cookie: &SessionToken,
        offset: u64,
        chunk: Bytes,
    ) -> impl Future<Output = Result<(), FileReacherError>> + Send {
        (**self).upload_chunk(cookie, offset, chunk)
    }

    fn complete_upload(
        &self,
        cookie: &SessionToken,
    ) -> impl Future<Output = Result<(), FileReacherError>> + Send {
        (**self).complete_upload(cookie)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Started,
    Uploading,
    Completing,
    Done,
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Done | UploadStatus::Failed)
    }
}

#[derive(Debug)]
pub struct UploadTask {
    file: UploadFile,
    destination: PathToken,
    session: Option<SessionToken>,
    offset: u64,
    status: UploadStatus,
}

impl UploadTask {
    pub fn new(file: UploadFile, destination: PathToken) -> Self {
        Self {
            file,
            destination,
            session: None,
            offset: 0,
            status: UploadStatus::Pending,
        }
    }

    pub fn file(&self) -> &UploadFile {
        &self.file
    }

    pub fn destination(&self) -> &PathToken {
        &self.destination
    }

    pub fn session(&self) -> Option<&SessionToken> {
        self.session.as_ref()
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// Drives the task from `Pending` to `Done` or `Failed`. Chunks are sent
    /// one at a time in offset order; nothing is retried.
    pub async fn run<A: UploadApi>(
        &mut self,
        api: &A,
        reporter: &dyn ProgressReporter,
        chunk_size: u64,
    ) -> Result<(), UploadError> {
        let chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
        match self.drive(api, reporter, chunk_size).await {
            Ok(()) => {
                self.status = UploadStatus::Done;
                info!(name = self.file.name(), size = self.file.size(), "upload done");
                Ok(())
            }
            Err(err) => {
                self.status = UploadStatus::Failed;
                warn!(name = self.file.name(), offset = self.offset, "upload failed: {err}");
                Err(err)
            }
        }
    }

    async fn drive<A: UploadApi>(
        &mut self,
        api: &A,
        reporter: &dyn ProgressReporter,
        chunk_size: u64,
    ) -> Result<(), UploadError> {
        let total = self.file.size();
        let mut reader = self.file.open().await.map_err(|err| self.io_error(err))?;

        let session = api
            .start_upload(&self.destination, total)
            .await
            .map_err(|err| self.api_error(err))?;
        let cookie = session.cookie;
        self.session = Some(cookie.clone());
        self.status = UploadStatus::Started;
        debug!(name = self.file.name(), cookie = cookie.as_str(), "upload started");
        reporter.show(self.file.name());
        reporter.set_progress(0.0);

        while self.offset < total {
            self.status = UploadStatus::Uploading;
            let len = chunk_size.min(total - self.offset);
            let chunk = reader
                .read_chunk(self.offset, len)
                .await
                .map_err(|err| self.io_error(err))?;
            api.upload_chunk(&cookie, self.offset, chunk)
                .await
                .map_err(|err| self.api_error(err))?;
            debug!(name = self.file.name(), offset = self.offset, len, "chunk sent");
            // progress reflects the bytes sent before this chunk
            reporter.set_progress(percentage(self.offset, total));
            self.offset = self.offset.saturating_add(chunk_size).min(total);
        }

        self.status = UploadStatus::Completing;
        api.complete_upload(&cookie)
            .await
            .map_err(|err| self.api_error(err))?;
        reporter.set_progress(100.0);
        Ok(())
    }

    fn api_error(&self, source: FileReacherError) -> UploadError {
        UploadError::Api {
            name: self.file.name().to_string(),
            source,
        }
    }

    fn io_error(&self, source: io::Error) -> UploadError {
        UploadError::Io {
            name: self.file.name().to_string(),
            source,
        }
    }
}

fn percentage(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    done as f64 / total as f64 * 100.0
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
