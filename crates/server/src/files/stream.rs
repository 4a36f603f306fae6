//! Chunked streaming of a single file.

use std::io;

use bytes::Bytes;
use futures_util::Stream;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

use super::error::FileError;
use super::resolver::ResolvedPath;

/// Default chunk size for streamed downloads (64KB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// An open file ready to be streamed.
///
/// The length is captured when the file is opened and the stream never
/// yields more than that many bytes. The stream is consumed once; dropping
/// it closes the file.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    len: u64,
    chunk_size: usize,
    name: String,
}

impl FileStream {
    /// Open a regular file for streaming.
    pub async fn open(path: &ResolvedPath, chunk_size: usize) -> Result<Self, FileError> {
        let not_found = || FileError::NotFound(path.requested().to_string());

        let file = File::open(path.as_path()).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                not_found()
            } else {
                FileError::Io(e)
            }
        })?;

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(FileError::invalid_type(
                path.requested(),
                "path is not a regular file",
            ));
        }

        Ok(Self {
            file,
            len: metadata.len(),
            chunk_size: chunk_size.max(1),
            name: path.file_name().ok_or_else(not_found)?,
        })
    }

    /// Size in bytes at the time the file was opened.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the file was empty when opened.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// File name for the download.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Turn into a stream of chunks of at most the configured chunk size.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        ReaderStream::with_capacity(self.file.take(self.len), self.chunk_size)
    }
}
