//! Overflow spill manager.
//!
//! Bounds peak ingestion memory: tracked listings accumulate in a buffer
//! and are flushed to numbered, immutable overflow segments once the
//! buffer reaches its threshold. The flush is awaited before the next
//! record is accepted, which is the deliberate backpressure point of the
//! pipeline. Segments are consumed strictly in ascending numeric order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::Listing;
use crate::storage::StoreBackend;

const SEGMENT_PREFIX: &str = "overflow_";
const SEGMENT_EXT: &str = ".json";

/// Buffers tracked listings and spills them to overflow segments.
pub struct SpillManager {
    backend: Arc<dyn StoreBackend>,
    dir: PathBuf,
    threshold: usize,
    buffer: Vec<Listing>,
    segment_counter: u64,
    flushes: usize,
}

impl SpillManager {
    /// Create a spill manager writing segments under `dir`.
    pub fn new(backend: Arc<dyn StoreBackend>, dir: impl Into<PathBuf>, threshold: usize) -> Self {
        Self {
            backend,
            dir: dir.into(),
            threshold,
            buffer: Vec::new(),
            segment_counter: 0,
            flushes: 0,
        }
    }

    /// Create a spill manager that continues after leftover segments from
    /// an earlier session, numbering new segments after the highest one
    /// found so that `finalize` replays old and new in original order.
    pub async fn recover(
        backend: Arc<dyn StoreBackend>,
        dir: impl Into<PathBuf>,
        threshold: usize,
    ) -> Result<Self> {
        let dir = dir.into();
        let existing = Self::segment_files(backend.as_ref(), &dir).await?;
        let next = match existing.last().and_then(|p| Self::segment_index(p)) {
            Some(max) => max + 1,
            None => 0,
        };
        if next > 0 {
            log::info!(
                "Recovered {} leftover overflow segment(s) under {:?}",
                existing.len(),
                dir
            );
        }
        Ok(Self {
            backend,
            dir,
            threshold,
            buffer: Vec::new(),
            segment_counter: next,
            flushes: 0,
        })
    }

    fn segment_path(&self, index: u64) -> PathBuf {
        self.dir
            .join(format!("{SEGMENT_PREFIX}{index:06}{SEGMENT_EXT}"))
    }

    fn segment_index(path: &Path) -> Option<u64> {
        let name = path.file_name()?.to_str()?;
        name.strip_prefix(SEGMENT_PREFIX)?
            .strip_suffix(SEGMENT_EXT)?
            .parse()
            .ok()
    }

    /// Segment files under `dir`, ascending by sequence number
    /// (zero-padded names make the name sort numeric).
    async fn segment_files(backend: &dyn StoreBackend, dir: &Path) -> Result<Vec<PathBuf>> {
        let files = backend.list_files(dir).await?;
        Ok(files
            .into_iter()
            .filter(|p| Self::segment_index(p).is_some())
            .collect())
    }

    /// Buffer a listing, flushing to disk when the threshold is reached.
    ///
    /// Returns only after any triggered segment write is durable.
    pub async fn track(&mut self, listing: Listing) -> Result<()> {
        self.buffer.push(listing);
        if self.buffer.len() >= self.threshold {
            self.flush().await?;
        }
        Ok(())
    }

    /// Write the buffer as the next overflow segment and clear it.
    ///
    /// No-op on an empty buffer.
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let path = self.segment_path(self.segment_counter);
        let bytes = serde_json::to_vec_pretty(&self.buffer)?;
        self.backend.write_bytes_atomic(&path, &bytes).await?;

        log::info!(
            "Spilled {} listing(s) to segment {:?}",
            self.buffer.len(),
            path
        );
        self.buffer.clear();
        self.segment_counter += 1;
        self.flushes += 1;
        Ok(())
    }

    /// Flush the remainder, then return every listing ever tracked, in
    /// original ingestion order, by replaying segments ascending.
    pub async fn finalize(&mut self) -> Result<Vec<Listing>> {
        self.flush().await?;

        let mut all = Vec::new();
        for path in Self::segment_files(self.backend.as_ref(), &self.dir).await? {
            let bytes = self
                .backend
                .read_bytes_optional(&path)
                .await?
                .ok_or_else(|| {
                    AppError::corrupted(path.display().to_string(), "overflow segment vanished")
                })?;
            let batch: Vec<Listing> = serde_json::from_slice(&bytes)?;
            all.extend(batch);
        }
        Ok(all)
    }

    /// Delete all segment files (and the spill directory if empty) and
    /// reset the counter. Run only after `finalize`'s output has been
    /// durably written elsewhere.
    pub async fn cleanup(&mut self) -> Result<()> {
        for path in Self::segment_files(self.backend.as_ref(), &self.dir).await? {
            self.backend.remove_file(&path).await?;
        }
        self.backend.remove_dir_if_empty(&self.dir).await?;
        self.segment_counter = 0;
        self.flushes = 0;
        Ok(())
    }

    /// Listings currently buffered in memory.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Segments written so far by this manager.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}
