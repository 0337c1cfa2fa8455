use std::io;
use std::path::{Path, PathBuf};

use filereacher_core::{FileReacherClient, FileReacherError, PathToken};
use futures_util::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("api error: {0}")]
    Api(#[from] FileReacherError),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Streams the remote file into `target`, writing to a `.partial` sibling
/// first so `target` only ever holds a complete download.
pub async fn download_to_path(
    client: &FileReacherClient,
    path: &PathToken,
    target: &Path,
) -> Result<u64, TransferError> {
    let response = client.download(path).await?;

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let partial = partial_path(target);
    let written = match write_stream(response, &partial).await {
        Ok(written) => written,
        Err(err) => {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(err);
        }
    };

    tokio::fs::rename(&partial, target).await?;
    debug!(target = %target.display(), bytes = written, "download finished");
    Ok(written)
}

async fn write_stream(response: reqwest::Response, partial: &Path) -> Result<u64, TransferError> {
    let mut file = tokio::fs::File::create(partial).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

fn partial_path(target: &Path) -> PathBuf {
    target.with_extension(format!(
        "{}partial",
        target
            .extension()
            .map(|ext| format!("{}.", ext.to_string_lossy()))
            .unwrap_or_default()
    ))
}
