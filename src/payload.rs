use std::path::{Path, PathBuf};

use aws_sdk_s3::primitives::ByteStream;

use crate::error::{Error, Result};

/// File contents held in memory for a single upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl FilePayload {
    pub fn new(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        FilePayload { path: path.into(), bytes }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_body(self) -> ByteStream {
        ByteStream::from(self.bytes)
    }
}

/// Reads the whole file at `path` into memory.
pub async fn read_local_file(path: impl AsRef<Path>) -> Result<FilePayload> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(FilePayload::new(path, bytes))
}
