// Real filesystem implementation for production use
//
// Design Decision: Thin wrapper around tokio::fs
//
// This is the "real" adapter behind the FileSystem port. Discovery tests
// use MockFileSystem or lay out a TempDir and use this type directly.

use super::traits::FileSystem;
use crate::error::{ProbeError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Real filesystem implementation using tokio::fs
///
/// Usage:
///     let fs = RealFileSystem;
///     let content = fs.read_to_string(Path::new("host.xml")).await?;
pub struct RealFileSystem;

#[async_trait]
impl FileSystem for RealFileSystem {
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path).await.map_err(ProbeError::Io)
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(path).await.map_err(ProbeError::Io)?;

        while let Some(entry) = read_dir.next_entry().await.map_err(ProbeError::Io)? {
            entries.push(entry.path());
        }

        Ok(entries)
    }
}
