use axum::body::Bytes;
use futures_util::{Stream, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, ErrorKind};
use tracing::warn;

/// Error raised by the content stream of an upload, boxed as-is.
pub type StreamError = Box<dyn std::error::Error + Send + Sync>;

/// Flat file store: every managed file is a direct child of `root`.
#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Maps a client supplied name to a path directly under the root.
    pub fn resolve_file(&self, name: &str) -> Result<PathBuf, StorageError> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0'])
        {
            return Err(StorageError::InvalidName);
        }
        Ok(self.root.join(name))
    }

    async fn resolve_checked(&self, name: &str) -> Result<PathBuf, StorageError> {
        let target = self.resolve_file(name)?;
        match fs::symlink_metadata(&target).await {
            Ok(metadata) if metadata.file_type().is_symlink() => Err(StorageError::InvalidName),
            Ok(_) => Ok(target),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(target),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    pub async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut dir = fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            // Names that are not UTF-8 cannot be addressed by download or delete.
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!(name = ?raw, "skipping non UTF-8 file name"),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Creates or truncates `name` and drains `content` into it.
    ///
    /// A failed stream leaves whatever was already written on disk.
    pub async fn upload<S, E>(&self, name: &str, content: S) -> Result<u64, StorageError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let target = self.resolve_checked(name).await?;
        let mut file = File::create(&target).await?;
        let mut content = std::pin::pin!(content);
        let mut written: u64 = 0;
        while let Some(chunk) = content.next().await {
            let chunk = chunk.map_err(|err| StorageError::Stream(Box::new(err)))?;
            if chunk.is_empty() {
                continue;
            }
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }

    /// Opens `name` for reading and returns it with its length.
    pub async fn open(&self, name: &str) -> Result<(File, u64), StorageError> {
        let target = self.resolve_checked(name).await?;
        let file = File::open(&target).await?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(StorageError::NotAFile);
        }
        Ok((file, metadata.len()))
    }

    pub async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let target = self.resolve_checked(name).await?;
        fs::remove_file(target).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid file name")]
    InvalidName,
    #[error("not a regular file")]
    NotAFile,
    #[error("upload stream failed: {0}")]
    Stream(#[source] StreamError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Io(err) if err.kind() == ErrorKind::NotFound)
    }
}
