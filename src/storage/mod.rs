//! Storage abstractions for listing persistence.
//!
//! The store lives in a single tabular file with one named section per
//! postal shard (see [`format`]). All writes to the canonical store
//! identity go through [`StoreBackend::write_bytes_atomic`], so a store
//! file is either the old complete version or the new complete version,
//! never a torn write.
//!
//! ## On-disk layout
//!
//! ```text
//! {dir}/
//! ├── listings.store            # canonical store (sectioned tabular file)
//! ├── listings.20260823T101500.bak  # rebuild backups (never auto-deleted)
//! └── spill/                    # overflow segments for the live session
//!     ├── overflow_000000.json
//!     └── overflow_000001.json
//! ```

pub mod format;
pub mod local;
pub mod store;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalBackend;
pub use store::{AppendOutcome, Shard, ShardedStore};

/// Trait for store file backends.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Read a file fully, returning `None` if it does not exist.
    async fn read_bytes_optional(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Write a file atomically (write to temp, then rename over `path`).
    async fn write_bytes_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Copy a file, creating parent directories for the destination.
    async fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Rename a file, replacing the destination if present.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a file; missing files are not an error.
    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Remove a directory if it exists and is empty.
    async fn remove_dir_if_empty(&self, path: &Path) -> Result<()>;

    /// List regular files directly under a directory, sorted by name.
    /// A missing directory yields an empty list.
    async fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>>;
}
