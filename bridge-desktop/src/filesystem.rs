//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{DirEntry, FileSystemAccess},
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Tokio-based file system implementation
#[derive(Debug, Default, Clone)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(path).await.map_err(Self::map_io_error)?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(Self::map_io_error)?
        {
            let entry_path = entry.path();
            // Follow symlinks so a linked folder is still treated as a folder.
            let is_directory = match fs::metadata(&entry_path).await {
                Ok(metadata) => metadata.is_dir(),
                Err(_) => entry
                    .file_type()
                    .await
                    .map(|t| t.is_dir())
                    .unwrap_or(false),
            };
            entries.push(DirEntry {
                path: entry_path,
                is_directory,
            });
        }

        debug!(path = ?path, count = entries.len(), "Listed directory");
        Ok(entries)
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn open_read_stream(
        &self,
        path: &Path,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        let file = fs::File::open(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Opened file for reading");
        Ok(Box::new(file))
    }

    async fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).await.map_err(Self::map_io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_directory_marks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let fs = TokioFileSystem::new();
        let mut entries = fs.list_directory(dir.path()).await.unwrap();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, dir.path().join("a.jpg"));
        assert!(!entries[0].is_directory);
        assert_eq!(entries[1].path, dir.path().join("nested"));
        assert!(entries[1].is_directory);
    }

    #[tokio::test]
    async fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("photo.jpg");
        std::fs::write(&file, b"Hello, World!").unwrap();

        let fs = TokioFileSystem::new();
        let data = fs.read_file(&file).await.unwrap();
        assert_eq!(&data[..], b"Hello, World!");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();

        let err = fs.read_file(&dir.path().join("missing.jpg")).await.unwrap_err();
        assert!(err.is_io());
    }

    #[tokio::test]
    async fn test_open_read_stream_yields_whole_file() {
        use tokio::io::AsyncReadExt;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        let content: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&file, &content).unwrap();

        let fs = TokioFileSystem::new();
        let mut stream = fs.open_read_stream(&file).await.unwrap();
        let mut read_back = Vec::new();
        stream.read_to_end(&mut read_back).await.unwrap();
        assert_eq!(read_back, content);
    }

    #[tokio::test]
    async fn test_open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();

        let err = fs
            .open_read_stream(&dir.path().join("missing.jpg"))
            .await
            .err()
            .unwrap();
        assert!(err.is_io());
    }

    #[tokio::test]
    async fn test_canonicalize_resolves_dot() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();

        let resolved = fs.canonicalize(&dir.path().join(".")).await.unwrap();
        assert_eq!(resolved, std::fs::canonicalize(dir.path()).unwrap());
    }
}
