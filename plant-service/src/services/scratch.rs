//! Request-scoped scratch files.
//!
//! Every file gets a UUID v4 name so concurrent requests never share a path.
//! A [`ScratchFile`] removes its file when released or dropped, whichever
//! comes first.

use crate::error::PlantError;
use axum::body::Bytes;
use futures::Stream;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

/// A directory of transient per-request files, created on demand.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create an empty scratch file and return it opened for writing.
    pub async fn create(
        &self,
        extension: Option<&str>,
    ) -> Result<(ScratchFile, fs::File), PlantError> {
        fs::create_dir_all(&self.root).await?;

        let name = match extension {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        Ok(ScratchFile::create_new(self.root.join(name)).await?)
    }

    /// Write `data` to a fresh scratch file.
    pub async fn write(
        &self,
        extension: Option<&str>,
        data: &[u8],
    ) -> Result<ScratchFile, PlantError> {
        let (scratch, mut file) = self.create(extension).await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(scratch)
    }
}

/// Owner of one scratch file on disk.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    released: bool,
}

impl ScratchFile {
    /// Create the file at `path`, failing if it already exists. The guard
    /// only takes ownership once this call created the file.
    async fn create_new(path: PathBuf) -> io::Result<(Self, fs::File)> {
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let scratch = Self {
            path,
            released: false,
        };
        Ok((scratch, file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path).await
    }

    /// Delete the file now.
    pub async fn release(mut self) -> Result<(), PlantError> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PlantError::CleanupFailed {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Stream the file's contents. The file is deleted once the stream is
    /// dropped, whether or not it was read to the end.
    pub async fn into_stream(self) -> io::Result<ScratchStream> {
        let file = fs::File::open(&self.path).await?;
        Ok(ScratchStream {
            inner: ReaderStream::new(file),
            _file: self,
        })
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Scratch file removed");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove scratch file"
                );
            }
        }
    }
}

/// Byte stream over a scratch file that owns the file's lifetime.
pub struct ScratchStream {
    inner: ReaderStream<fs::File>,
    _file: ScratchFile,
}

impl Stream for ScratchStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
