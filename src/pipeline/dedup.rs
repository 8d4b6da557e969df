//! Deduplication index.
//!
//! Uniqueness is enforced at composite-key granularity: two listings at the
//! same address may coexist as long as their price/agent discriminator
//! differs. Classification is a pure check; registration is applied
//! separately, after the store append succeeded.

use std::collections::HashSet;

use crate::models::Listing;

/// Verdict of classifying one candidate against the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// First listing seen under this primary key
    Accepted,
    /// Same primary key and same discriminator already registered
    ExactDuplicate,
    /// Known primary key, new discriminator
    Variant,
}

/// In-memory index over primary and composite keys.
#[derive(Debug, Clone, Default)]
pub struct DedupIndex {
    primary_keys: HashSet<String>,
    composite_keys: HashSet<String>,
}

impl DedupIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a candidate without mutating the index.
    pub fn classify(&self, candidate: &Listing) -> Classification {
        if !self.primary_keys.contains(&candidate.primary_key()) {
            return Classification::Accepted;
        }
        if self.composite_keys.contains(&candidate.composite_key()) {
            return Classification::ExactDuplicate;
        }
        Classification::Variant
    }

    /// Register a listing under its primary and composite keys.
    pub fn register(&mut self, listing: &Listing) {
        self.primary_keys.insert(listing.primary_key());
        self.composite_keys.insert(listing.composite_key());
    }

    /// Number of distinct composite keys registered.
    pub fn len(&self) -> usize {
        self.composite_keys.len()
    }

    /// True when nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.composite_keys.is_empty()
    }
}
