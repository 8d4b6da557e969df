// src/lib.rs

//! listingstore — ingestion and sharded storage for crawled real-estate
//! listings.
//!
//! An external crawler discovers listings one at a time and hands each to
//! [`pipeline::ListingIngestor`], which deduplicates at composite-key
//! granularity (address+postal identity, price+agent discriminator),
//! partitions accepted rows into bounded postal-prefix shards, and bounds
//! memory by spilling to numbered overflow segments. Persisted stores can
//! be health-checked ([`pipeline::HealthValidator`]) and rebuilt from
//! structural damage ([`pipeline::StoreRebuilder`]), always behind a
//! timestamped backup.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};
pub use models::Listing;
pub use pipeline::{ListingIngestor, StoreRebuilder, Verdict};
pub use storage::LocalBackend;
