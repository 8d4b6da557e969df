// src/models/mod.rs

//! Data structures shared across the store.

pub mod listing;
pub mod report;

pub use listing::{FALLBACK_SHARD, GEO_UNKNOWN, Listing, normalize};
pub use report::{HealthReport, IngestStats, RebuildOutcome, RebuildStats};
