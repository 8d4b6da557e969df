//! Per-record ingestion façade.
//!
//! The crawler hands each discovered listing to [`ListingIngestor::accept`]
//! and gets a verdict back. Internally the ingestor composes the dedup
//! index, the bounded sharded store, and the spill manager; classification,
//! store append, and spill bookkeeping all complete before `accept`
//! returns. One session owns one store identity exclusively.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::models::{IngestStats, Listing};
use crate::pipeline::dedup::{Classification, DedupIndex};
use crate::pipeline::health::load_store;
use crate::pipeline::lock::SessionLock;
use crate::pipeline::spill::SpillManager;
use crate::storage::{AppendOutcome, ShardedStore, StoreBackend, format};

/// Acceptance verdict for one candidate listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Stored (new primary key or a variant of a known one)
    Accepted,
    /// Same composite key already in the store; nothing changed
    ExactDuplicate,
    /// Missing address or postal; dropped and counted, never an error
    Malformed,
    /// Shard or store row limit hit; remediate (rebuild) before retrying
    CapacityExceeded,
}

/// One exclusive ingestion session against a store identity.
pub struct ListingIngestor {
    backend: Arc<dyn StoreBackend>,
    store_path: PathBuf,
    config: Config,
    _lock: SessionLock,
    index: DedupIndex,
    store: ShardedStore,
    spill: SpillManager,
    stats: IngestStats,
    needs_rebuild: bool,
}

impl ListingIngestor {
    /// Open a session: take the store lock, raw-load any existing store,
    /// and seed the dedup index from its well-formed rows.
    pub async fn open(
        backend: Arc<dyn StoreBackend>,
        store_path: impl Into<PathBuf>,
        config: Config,
    ) -> Result<Self> {
        config.validate()?;
        let store_path = store_path.into();
        let lock = SessionLock::acquire(&store_path)?;

        let store = load_store(
            backend.as_ref(),
            &store_path,
            config.limits.max_rows_per_shard,
        )
        .await?;

        let mut index = DedupIndex::new();
        for row in store.iter_rows() {
            if row.is_well_formed() {
                index.register(row);
            }
        }

        let spill_dir = store_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&config.spill.spill_dir);
        let mut spill =
            SpillManager::recover(backend.clone(), spill_dir, config.spill.buffer_threshold)
                .await?;

        // Merge back anything a crashed session left in overflow segments.
        // The segments stay on disk until finish() has persisted the store.
        let mut store = store;
        let leftovers = spill.finalize().await?;
        if !leftovers.is_empty() {
            let mut merged = 0usize;
            for row in leftovers {
                if !row.is_well_formed()
                    || index.classify(&row) == Classification::ExactDuplicate
                {
                    continue;
                }
                if store.try_append(row.clone()) == AppendOutcome::Appended {
                    index.register(&row);
                    merged += 1;
                }
            }
            log::info!("Replayed {merged} listing(s) from leftover overflow segments");
        }

        log::info!(
            "Ingestion session opened on {:?}: {} existing row(s), {} key(s) indexed",
            store_path,
            store.total_rows(),
            index.len()
        );

        Ok(Self {
            backend,
            store_path,
            config,
            _lock: lock,
            index,
            store,
            spill,
            stats: IngestStats::default(),
            needs_rebuild: false,
        })
    }

    /// Accept or reject one candidate listing.
    ///
    /// Per-record problems never surface as errors; only I/O failures do.
    pub async fn accept(&mut self, candidate: Listing) -> Result<Verdict> {
        if self.needs_rebuild {
            self.stats.capacity_rejected += 1;
            return Ok(Verdict::CapacityExceeded);
        }

        if !candidate.is_well_formed() {
            self.stats.malformed_skipped += 1;
            return Ok(Verdict::Malformed);
        }

        let classification = self.index.classify(&candidate);
        if classification == Classification::ExactDuplicate {
            self.stats.exact_duplicates += 1;
            return Ok(Verdict::ExactDuplicate);
        }

        // Store-wide ceiling: crossing it mandates a rebuild before any
        // further ingestion into this identity.
        if self.store.total_rows() >= self.config.limits.safe_max_rows {
            log::warn!(
                "Store {:?} reached safe_max_rows ({}); pausing ingestion until rebuild",
                self.store_path,
                self.config.limits.safe_max_rows
            );
            self.needs_rebuild = true;
            self.stats.capacity_rejected += 1;
            return Ok(Verdict::CapacityExceeded);
        }

        match self.store.try_append(candidate.clone()) {
            AppendOutcome::ShardFull { .. } => {
                self.stats.capacity_rejected += 1;
                Ok(Verdict::CapacityExceeded)
            }
            AppendOutcome::Appended => {
                // Registration is coupled to a successful append; spill
                // tracking may block on a segment write (backpressure).
                self.index.register(&candidate);
                match classification {
                    Classification::Accepted => self.stats.accepted += 1,
                    Classification::Variant => self.stats.variants += 1,
                    Classification::ExactDuplicate => unreachable!("filtered above"),
                }
                self.spill.track(candidate).await?;
                Ok(Verdict::Accepted)
            }
        }
    }

    /// True once the store-wide ceiling was hit; the caller should run a
    /// rebuild against this identity before ingesting further.
    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// The in-memory store as of the last accepted record.
    pub fn store(&self) -> &ShardedStore {
        &self.store
    }

    /// Session counters so far.
    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Close the session: flush the spill remainder, persist the store
    /// atomically, then clean up the consumed segments.
    ///
    /// Safe to call after a mid-stream stop signal; everything tracked
    /// before the stop is flushed here.
    pub async fn finish(mut self) -> Result<IngestStats> {
        let tracked = self.spill.finalize().await?;
        if tracked.len() != self.stats.stored() {
            log::warn!(
                "Spill replay count {} differs from session count {}",
                tracked.len(),
                self.stats.stored()
            );
        }

        let bytes = format::serialize_store(&self.store);
        self.backend
            .write_bytes_atomic(&self.store_path, bytes.as_bytes())
            .await?;

        // Segments are only deleted after the store write is durable.
        self.stats.flushes = self.spill.flush_count();
        self.spill.cleanup().await?;

        log::info!(
            "Ingestion session closed on {:?}: {} stored ({} new, {} variant), \
             {} duplicate(s), {} malformed, {} capacity-rejected",
            self.store_path,
            self.stats.stored(),
            self.stats.accepted,
            self.stats.variants,
            self.stats.exact_duplicates,
            self.stats.malformed_skipped,
            self.stats.capacity_rejected
        );
        Ok(self.stats)
    }
}
