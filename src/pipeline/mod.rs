// src/pipeline/mod.rs

//! Ingestion and maintenance stages.
//!
//! The crawler-facing path is `dedup` → `store append` → `spill`, composed
//! by [`ingest::ListingIngestor`]. `health` and `rebuild` run against a
//! persisted store identity, on startup or when capacity warnings fire.

pub mod dedup;
pub mod health;
pub mod ingest;
pub mod lock;
pub mod rebuild;
pub mod spill;

pub use dedup::{Classification, DedupIndex};
pub use health::{HealthValidator, load_store};
pub use ingest::{ListingIngestor, Verdict};
pub use lock::SessionLock;
pub use rebuild::StoreRebuilder;
pub use spill::SpillManager;
