//! In-memory sharded store.
//!
//! Accepted listings are partitioned into bounded shards keyed by the
//! two-character postal prefix. The store object is owned by one ingestion
//! session (or one rebuild) at a time; it mirrors the on-disk state and is
//! serialized through [`crate::storage::format`].

use std::collections::BTreeMap;

use crate::models::Listing;

/// Outcome of a bounded append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Row stored
    Appended,
    /// Shard already at its row limit; nothing was mutated
    ShardFull { shard: String, limit: usize },
}

/// A named, bounded partition of the store.
#[derive(Debug, Clone)]
pub struct Shard {
    key: String,
    rows: Vec<Listing>,
}

impl Shard {
    fn new(key: String) -> Self {
        Self {
            key,
            rows: Vec::new(),
        }
    }

    /// Shard routing key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> &[Listing] {
        &self.rows
    }

    /// Row count.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the shard holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The full set of shards plus a global row count.
///
/// `BTreeMap` keeps shards in lexicographic key order, which is also the
/// serialization order.
#[derive(Debug, Clone)]
pub struct ShardedStore {
    shards: BTreeMap<String, Shard>,
    max_rows_per_shard: usize,
    total_rows: usize,
}

impl ShardedStore {
    /// Create an empty store with the given per-shard row limit.
    pub fn new(max_rows_per_shard: usize) -> Self {
        Self {
            shards: BTreeMap::new(),
            max_rows_per_shard,
            total_rows: 0,
        }
    }

    /// Rebuild a store from raw-parsed shard/row pairs, preserving the
    /// file's shard assignment and row order. No limits are enforced; a
    /// damaged store must stay inspectable.
    pub fn from_raw(raw: Vec<(String, Vec<Listing>)>, max_rows_per_shard: usize) -> Self {
        let mut store = Self::new(max_rows_per_shard);
        for (key, rows) in raw {
            let shard = store
                .shards
                .entry(key.clone())
                .or_insert_with(|| Shard::new(key));
            store.total_rows += rows.len();
            shard.rows.extend(rows);
        }
        store
    }

    /// Shard routing key for a listing.
    pub fn route(listing: &Listing) -> String {
        listing.shard_key()
    }

    /// Append a listing to its shard, lazily creating the shard.
    ///
    /// Returns [`AppendOutcome::ShardFull`] without mutating anything when
    /// the target shard is at its limit.
    pub fn try_append(&mut self, listing: Listing) -> AppendOutcome {
        let key = Self::route(&listing);
        let limit = self.max_rows_per_shard;
        let shard = self
            .shards
            .entry(key.clone())
            .or_insert_with(|| Shard::new(key.clone()));

        if shard.rows.len() >= limit {
            log::warn!("Shard {} is full ({} rows)", key, limit);
            return AppendOutcome::ShardFull { shard: key, limit };
        }

        shard.rows.push(listing);
        self.total_rows += 1;
        AppendOutcome::Appended
    }

    /// Iterate shards in lexicographic key order.
    pub fn shards(&self) -> impl Iterator<Item = &Shard> {
        self.shards.values()
    }

    /// Look up one shard by key.
    pub fn shard(&self, key: &str) -> Option<&Shard> {
        self.shards.get(key)
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Rows across all shards.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Configured per-shard row limit.
    pub fn max_rows_per_shard(&self) -> usize {
        self.max_rows_per_shard
    }

    /// All rows in shard-then-insertion order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &Listing> {
        self.shards.values().flat_map(|s| s.rows.iter())
    }
}
