use std::io;
use std::path::Path;
use std::sync::Arc;

use filereacher_core::path::{self, PathError, PathToken};
use filereacher_core::{ErrorKind, FileReacherClient, FileReacherError};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use crate::navigation::{History, NavigationController, NavigationError, SessionHistory};
use crate::transfer::{self, TransferError};
use crate::upload::{
    ProgressReporter, QueueError, QueueEvent, UploadConfig, UploadError, UploadFile, UploadQueue,
    UploadWorker, upload_queue,
};

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error(transparent)]
    Api(#[from] FileReacherError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error("invalid name: {0}")]
    Path(#[from] PathError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ExplorerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExplorerError::Api(err) => err.kind(),
            ExplorerError::Navigation(err) => err.kind(),
            ExplorerError::Path(_) => ErrorKind::Decoding,
            ExplorerError::Upload(err) => err.kind(),
            ExplorerError::Transfer(TransferError::Api(err)) => err.kind(),
            ExplorerError::Queue(_) | ExplorerError::Transfer(_) | ExplorerError::Io(_) => {
                ErrorKind::Transport
            }
        }
    }
}

/// What a batch of uploads left behind once the queue drained.
#[derive(Debug, Default)]
pub struct Settled {
    pub failures: Vec<UploadError>,
    /// Set when the listing could not be refreshed after the last drain.
    pub refresh_error: Option<ExplorerError>,
}

impl Settled {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.refresh_error.is_none()
    }
}

/// A browsing session: the current location, the upload queue feeding it,
/// and the entry operations addressed relative to that location.
pub struct Explorer<H> {
    client: FileReacherClient,
    navigation: NavigationController<FileReacherClient, H>,
    uploads: UploadQueue,
    events: mpsc::UnboundedReceiver<QueueEvent>,
}

impl<H: History> Explorer<H> {
    /// Fetches the store info and builds the session. The returned worker
    /// must be spawned for uploads to progress.
    pub async fn connect(
        client: FileReacherClient,
        history: H,
        reporter: Arc<dyn ProgressReporter>,
        config: UploadConfig,
    ) -> Result<(Self, UploadWorker<FileReacherClient>), FileReacherError> {
        let store = client.info().await?;
        info!(store = %store.name, url = %client.base_url(), "connected");
        Ok(Self::with_store_name(
            client, history, reporter, config, store.name,
        ))
    }

    pub fn with_store_name(
        client: FileReacherClient,
        history: H,
        reporter: Arc<dyn ProgressReporter>,
        config: UploadConfig,
        store_name: impl Into<String>,
    ) -> (Self, UploadWorker<FileReacherClient>) {
        let (uploads, worker, events) = upload_queue(client.clone(), reporter, config);
        let navigation = NavigationController::new(client.clone(), history, store_name);
        (
            Self {
                client,
                navigation,
                uploads,
                events,
            },
            worker,
        )
    }

    pub fn navigation(&self) -> &NavigationController<FileReacherClient, H> {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut NavigationController<FileReacherClient, H> {
        &mut self.navigation
    }

    pub fn uploads(&self) -> &UploadQueue {
        &self.uploads
    }

    /// Shows the location recorded in history, as on startup.
    pub async fn start(&mut self) -> Result<(), ExplorerError> {
        self.navigation.on_history_pop().await?;
        Ok(())
    }

    pub async fn open(&mut self, name: &str) -> Result<(), ExplorerError> {
        self.navigation.navigate(Some(name), true).await?;
        Ok(())
    }

    pub async fn up(&mut self) -> Result<(), ExplorerError> {
        self.navigation.ascend(true).await?;
        Ok(())
    }

    pub async fn jump(&mut self, token: &PathToken) -> Result<(), ExplorerError> {
        self.navigation.restore(token, true).await?;
        Ok(())
    }

    pub async fn refresh(&mut self) -> Result<(), ExplorerError> {
        self.navigation.refresh().await?;
        Ok(())
    }

    pub async fn mkdir(&mut self, name: &str) -> Result<(), ExplorerError> {
        let target = self.entry(name)?;
        self.client.mkdir(&target).await?;
        self.refresh().await
    }

    pub async fn rename(&mut self, name: &str, to: &str) -> Result<(), ExplorerError> {
        let source = self.entry(name)?;
        let target = self.entry(to)?;
        self.client.rename(&source, &target).await?;
        self.refresh().await
    }

    pub async fn delete_file(&mut self, name: &str) -> Result<(), ExplorerError> {
        let target = self.entry(name)?;
        self.client.delete(&target).await?;
        self.refresh().await
    }

    /// Removes a directory together with its contents.
    pub async fn delete_dir(&mut self, name: &str) -> Result<(), ExplorerError> {
        let target = self.entry(name)?;
        self.client.rmdir(&target).await?;
        self.refresh().await
    }

    pub async fn download(&self, name: &str, target: &Path) -> Result<u64, ExplorerError> {
        let source = self.entry(name)?;
        Ok(transfer::download_to_path(&self.client, &source, target).await?)
    }

    /// Queues `file` for the current directory.
    pub fn upload(&self, file: UploadFile) -> Result<(), ExplorerError> {
        let destination = self.entry(file.name())?;
        self.uploads.submit(file, destination)?;
        Ok(())
    }

    pub fn upload_many<I>(&self, files: I) -> Result<(), ExplorerError>
    where
        I: IntoIterator<Item = UploadFile>,
    {
        for file in files {
            self.upload(file)?;
        }
        Ok(())
    }

    /// Reacts to one queue event: a drained queue refreshes the listing, a
    /// failed upload is handed back to the caller.
    pub async fn handle_event(&mut self, event: QueueEvent) -> Result<(), ExplorerError> {
        match event {
            QueueEvent::Finished {
                result: Err(err), ..
            } => Err(err.into()),
            QueueEvent::Finished { .. } => Ok(()),
            QueueEvent::Drained => self.refresh().await,
        }
    }

    /// Waits for queued uploads to settle. Every failed upload is returned,
    /// even when the refresh that follows the drain fails.
    pub async fn settle_uploads(&mut self) -> Settled {
        let mut settled = Settled::default();
        if self.uploads.pending() == 0 && self.events.is_empty() {
            return settled;
        }
        while let Some(event) = self.events.recv().await {
            match event {
                QueueEvent::Finished {
                    result: Err(err), ..
                } => settled.failures.push(err),
                QueueEvent::Finished { .. } => {}
                QueueEvent::Drained => {
                    settled.refresh_error = self.refresh().await.err();
                    if self.uploads.pending() == 0 && self.events.is_empty() {
                        break;
                    }
                }
            }
        }
        settled
    }

    pub async fn next_event(&mut self) -> Option<QueueEvent> {
        self.events.recv().await
    }

    fn entry(&self, name: &str) -> Result<PathToken, PathError> {
        path::encode_with_name(self.navigation.current(), name)
    }
}

impl Explorer<SessionHistory> {
    /// Steps back in history and shows that location. Returns `false` at
    /// the oldest entry.
    pub async fn back(&mut self) -> Result<bool, ExplorerError> {
        if !self.navigation.history_mut().back() {
            return Ok(false);
        }
        self.navigation.on_history_pop().await?;
        Ok(true)
    }

    pub async fn forward(&mut self) -> Result<bool, ExplorerError> {
        if !self.navigation.history_mut().forward() {
            return Ok(false);
        }
        self.navigation.on_history_pop().await?;
        Ok(true)
    }
}
