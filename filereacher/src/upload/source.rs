use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

#[derive(Debug, Clone)]
pub enum UploadSource {
    File(PathBuf),
    Memory(Bytes),
}

/// A file handed to the upload queue. The size is fixed at submission.
#[derive(Debug, Clone)]
pub struct UploadFile {
    name: String,
    size: u64,
    source: UploadSource,
}

impl UploadFile {
    pub async fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} has no file name", path.display()),
                )
            })?;
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        Ok(Self {
            name,
            size: metadata.len(),
            source: UploadSource::File(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            source: UploadSource::Memory(data),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn source(&self) -> &UploadSource {
        &self.source
    }

    pub(crate) async fn open(&self) -> io::Result<ChunkReader> {
        Ok(match &self.source {
            UploadSource::File(path) => ChunkReader::File(tokio::fs::File::open(path).await?),
            UploadSource::Memory(data) => ChunkReader::Memory(data.clone()),
        })
    }
}

pub(crate) enum ChunkReader {
    File(tokio::fs::File),
    Memory(Bytes),
}

impl ChunkReader {
    pub(crate) async fn read_chunk(&mut self, offset: u64, len: u64) -> io::Result<Bytes> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "chunk too large"))?;
        match self {
            ChunkReader::File(file) => {
                file.seek(SeekFrom::Start(offset)).await?;
                let mut buf = vec![0u8; len];
                file.read_exact(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
            ChunkReader::Memory(data) => {
                let start = usize::try_from(offset).unwrap_or(usize::MAX);
                let end = start.saturating_add(len);
                if end > data.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "chunk past end of buffer",
                    ));
                }
                Ok(data.slice(start..end))
            }
        }
    }
}
