//! Result objects returned by the health scan, rebuild, and ingestion.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structural health of a persisted store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HealthReport {
    /// Number of shards present
    pub total_shards: usize,
    /// Rows across all shards
    pub total_rows: usize,
    /// Rows with every field blank
    pub empty_rows: usize,
    /// Rows missing address or postal
    pub invalid_rows: usize,
    /// Shards flagged by any per-shard rule
    pub corrupted_shards: usize,
    /// Human-readable findings; empty means healthy
    pub issues: Vec<String>,
}

impl HealthReport {
    /// A store is healthy when the scan produced no findings.
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Counters collected during a rebuild pass.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RebuildStats {
    /// Records surviving into the rebuilt store
    pub total_listings: usize,
    /// Shards in the rebuilt store
    pub shards_created: usize,
    /// Rows rejected as exact duplicates during the fresh dedup pass
    pub duplicates_removed: usize,
    /// Rows dropped for missing address or postal
    pub corrupted_rows_skipped: usize,
    /// Rows dropped because their shard was already full
    pub capacity_dropped: usize,
    /// Whether the rebuilt file replaced the original identity
    pub replaced_original: bool,
    /// Whether the original could not be parsed (rebuilt from nothing)
    pub original_parse_failed: bool,
}

/// Outcome of a store rebuild.
#[derive(Debug, Clone)]
pub struct RebuildOutcome {
    /// False only when the rebuilt file could not replace the original
    pub success: bool,
    /// Where the rebuilt store ended up
    pub new_store_path: PathBuf,
    /// The mandatory pre-rebuild backup copy
    pub backup_path: PathBuf,
    /// When the rebuild ran
    pub timestamp: DateTime<Utc>,
    /// Pass counters
    pub stats: RebuildStats,
}

/// Counters for one ingestion session.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestStats {
    /// New primary keys accepted
    pub accepted: usize,
    /// Accepted records that were variants of an existing primary key
    pub variants: usize,
    /// Records rejected as exact duplicates
    pub exact_duplicates: usize,
    /// Records dropped for missing address or postal
    pub malformed_skipped: usize,
    /// Records rejected by a shard or store row limit
    pub capacity_rejected: usize,
    /// Overflow segments written
    pub flushes: usize,
}

impl IngestStats {
    /// Total records stored this session (new keys plus variants).
    pub fn stored(&self) -> usize {
        self.accepted + self.variants
    }
}
