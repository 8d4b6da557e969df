//! Local filesystem storage backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::StoreBackend;

/// Local filesystem backend with write-temp-then-rename discipline.
#[derive(Debug, Clone, Default)]
pub struct LocalBackend;

impl LocalBackend {
    /// Create a new local backend.
    pub fn new() -> Self {
        Self
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StoreBackend for LocalBackend {
    async fn read_bytes_optional(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn write_bytes_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        Self::ensure_dir(to).await?;
        tokio::fs::copy(from, to).await?;
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        Self::ensure_dir(to).await?;
        tokio::fs::rename(from, to).await?;
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn remove_dir_if_empty(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_dir(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            // Non-empty directory: leave it alone
            Err(e) if e.kind() == std::io::ErrorKind::DirectoryNotEmpty => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_and_read_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let backend = LocalBackend::new();
        let path = tmp.path().join("data/test.store");

        backend.write_bytes_atomic(&path, b"hello").await.unwrap();
        let data = backend.read_bytes_optional(&path).await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn read_nonexistent_returns_none() {
        let tmp = TempDir::new().unwrap();
        let backend = LocalBackend::new();

        let data = backend
            .read_bytes_optional(&tmp.path().join("nope.store"))
            .await
            .unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let backend = LocalBackend::new();
        let path = tmp.path().join("test.store");

        backend.write_bytes_atomic(&path, b"v1").await.unwrap();
        backend.write_bytes_atomic(&path, b"v2").await.unwrap();

        let files = backend.list_files(tmp.path()).await.unwrap();
        assert_eq!(files, vec![path.clone()]);
        assert_eq!(
            backend.read_bytes_optional(&path).await.unwrap(),
            Some(b"v2".to_vec())
        );
    }

    #[tokio::test]
    async fn remove_file_tolerates_missing() {
        let tmp = TempDir::new().unwrap();
        let backend = LocalBackend::new();
        backend
            .remove_file(&tmp.path().join("ghost.json"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_files_sorted_and_skips_dirs() {
        let tmp = TempDir::new().unwrap();
        let backend = LocalBackend::new();

        backend
            .write_bytes_atomic(&tmp.path().join("b.json"), b"{}")
            .await
            .unwrap();
        backend
            .write_bytes_atomic(&tmp.path().join("a.json"), b"{}")
            .await
            .unwrap();
        tokio::fs::create_dir(tmp.path().join("sub")).await.unwrap();

        let files = backend.list_files(tmp.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }
}
