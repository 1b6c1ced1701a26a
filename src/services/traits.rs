// Trait seams for the infrastructure discovery depends on
//
// Design Decision: Discovery never touches the OS directly
//
// EndpointDiscovery reads boot configuration files and inspects module
// directories through `FileSystem`, and gets its candidate processes from
// `ProcessSource`. Production wiring uses RealFileSystem and
// SystemProcessSource; unit tests use the mockall-generated mocks.
//
// All traits are Send + Sync so one instance can be shared via Arc across
// tokio tasks.

use crate::error::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Filesystem abstraction for the reads discovery performs
///
/// Usage:
///     let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
///     let xml = fs.read_to_string(Path::new("standalone/configuration/standalone.xml")).await?;
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read entire file contents as a UTF-8 string
    ///
    /// # Errors
    /// - File not found
    /// - Permission denied
    /// - Invalid UTF-8 encoding
    async fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Check if a path exists (file or directory)
    ///
    /// Returns false on permission errors (cannot distinguish from non-existence)
    async fn exists(&self, path: &Path) -> bool;

    /// Read directory entries, returning their paths
    ///
    /// # Errors
    /// - Directory not found
    /// - Permission denied
    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// One OS process as seen by discovery
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub parent_pid: Option<u32>,
    /// Full argument vector, program first
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
}

impl ProcessInfo {
    pub fn new(pid: u32, args: &[&str]) -> Self {
        Self {
            pid,
            args: args.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }
}

/// Source of candidate server processes
#[cfg_attr(test, automock)]
pub trait ProcessSource: Send + Sync {
    /// Snapshot of the processes currently running
    fn processes(&self) -> Vec<ProcessInfo>;
}
