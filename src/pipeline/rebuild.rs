//! Store rebuild: reconstruct a clean store from a damaged one.
//!
//! The pass always copies the original aside first, salvages every
//! well-formed row through a fresh deduplication index, writes the rebuilt
//! store to a side file, and only then renames it over the original
//! identity. An I/O failure anywhere leaves the backup and the original
//! untouched; a failed final rename is reported, not retried.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{RebuildOutcome, RebuildStats};
use crate::pipeline::dedup::{Classification, DedupIndex};
use crate::pipeline::health::load_store;
use crate::pipeline::lock::SessionLock;
use crate::storage::{AppendOutcome, ShardedStore, StoreBackend, format};

/// Rebuilds persisted stores.
pub struct StoreRebuilder {
    backend: Arc<dyn StoreBackend>,
    config: Config,
}

impl StoreRebuilder {
    /// Create a rebuilder using the given backend and limits.
    pub fn new(backend: Arc<dyn StoreBackend>, config: Config) -> Self {
        Self { backend, config }
    }

    /// Backup name: original stem plus a UTC timestamp.
    fn backup_path(store_path: &Path) -> PathBuf {
        let stem = store_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "store".to_string());
        let stamp = Utc::now().format("%Y%m%dT%H%M%S");
        store_path.with_file_name(format!("{stem}.{stamp}.bak"))
    }

    /// Side file the rebuilt store is written to before the final rename.
    fn rebuilt_path(store_path: &Path) -> PathBuf {
        let name = store_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "store".to_string());
        store_path.with_file_name(format!("{name}.rebuilt"))
    }

    /// Rebuild the store at `store_path`, replacing it in place on success.
    pub async fn rebuild(&self, store_path: &Path) -> Result<RebuildOutcome> {
        let _lock = SessionLock::acquire(store_path)?;

        if self
            .backend
            .read_bytes_optional(store_path)
            .await?
            .is_none()
        {
            return Err(AppError::validation(format!(
                "cannot rebuild: store file not found at {}",
                store_path.display()
            )));
        }

        // Mandatory insurance: the original is copied aside before anything
        // else, even if it turns out to be unparseable.
        let backup_path = Self::backup_path(store_path);
        self.backend.copy(store_path, &backup_path).await?;
        log::info!("Backed up {:?} to {:?}", store_path, backup_path);

        let mut stats = RebuildStats::default();

        let loaded = match load_store(
            self.backend.as_ref(),
            store_path,
            self.config.limits.max_rows_per_shard,
        )
        .await
        {
            Ok(store) => store,
            Err(AppError::StoreCorrupted { context, message }) => {
                log::warn!(
                    "Original store unparseable ({context}: {message}); rebuilding from empty"
                );
                stats.original_parse_failed = true;
                ShardedStore::new(self.config.limits.max_rows_per_shard)
            }
            Err(e) => return Err(e),
        };

        // Salvage pass: shard-then-row order, fresh dedup index.
        let mut index = DedupIndex::new();
        let mut rebuilt = ShardedStore::new(self.config.limits.max_rows_per_shard);

        for row in loaded.iter_rows() {
            if !row.is_well_formed() {
                stats.corrupted_rows_skipped += 1;
                continue;
            }
            if index.classify(row) == Classification::ExactDuplicate {
                stats.duplicates_removed += 1;
                continue;
            }
            match rebuilt.try_append(row.clone()) {
                AppendOutcome::Appended => index.register(row),
                AppendOutcome::ShardFull { shard, limit } => {
                    log::warn!(
                        "Dropping salvaged row for {}: shard {} at limit {}",
                        row.primary_key(),
                        shard,
                        limit
                    );
                    stats.capacity_dropped += 1;
                }
            }
        }

        stats.total_listings = rebuilt.total_rows();
        stats.shards_created = rebuilt.shard_count();

        // Write the rebuilt store to a side file, then swing the identity.
        let rebuilt_path = Self::rebuilt_path(store_path);
        let bytes = format::serialize_store(&rebuilt);
        self.backend
            .write_bytes_atomic(&rebuilt_path, bytes.as_bytes())
            .await?;

        let (success, new_store_path) = match self.backend.rename(&rebuilt_path, store_path).await
        {
            Ok(()) => {
                stats.replaced_original = true;
                (true, store_path.to_path_buf())
            }
            Err(e) => {
                log::error!(
                    "Could not replace {:?}; rebuilt store left at {:?}: {}",
                    store_path,
                    rebuilt_path,
                    e
                );
                (false, rebuilt_path)
            }
        };

        log::info!(
            "Rebuild of {:?}: {} listing(s) in {} shard(s), {} duplicate(s) removed, \
             {} corrupted row(s) skipped, {} dropped at capacity",
            store_path,
            stats.total_listings,
            stats.shards_created,
            stats.duplicates_removed,
            stats.corrupted_rows_skipped,
            stats.capacity_dropped
        );

        Ok(RebuildOutcome {
            success,
            new_store_path,
            backup_path,
            timestamp: Utc::now(),
            stats,
        })
    }
}
