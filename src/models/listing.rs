//! Listing record and derived keys.

use serde::{Deserialize, Serialize};

/// Sentinel stored when a geo coordinate is absent.
pub const GEO_UNKNOWN: &str = "N/A";

/// Shard bucket for records whose postal code is too short to route.
pub const FALLBACK_SHARD: &str = "__";

/// A single listing emitted by the crawler.
///
/// All fields are plain strings; nothing beyond presence of `address` and
/// `postal` is validated here. `date` is a display date and not guaranteed
/// to sort chronologically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    /// Listing display date
    pub date: String,

    /// Street address (free text)
    pub address: String,

    /// City name
    pub city: String,

    /// State or province
    pub state: String,

    /// Postal code (may be malformed or empty)
    pub postal: String,

    /// Listing agent name
    pub agent: String,

    /// Brokerage name
    pub broker: String,

    /// Currency-formatted price string
    pub price: String,

    /// Latitude as a numeric string, or "N/A"
    pub latitude: String,

    /// Longitude as a numeric string, or "N/A"
    pub longitude: String,
}

/// Trim and uppercase a field for key derivation.
pub fn normalize(s: &str) -> String {
    s.trim().to_uppercase()
}

impl Listing {
    /// Identity of the physical listing: normalized address + postal.
    pub fn primary_key(&self) -> String {
        format!("{}-{}", normalize(&self.address), normalize(&self.postal))
    }

    /// Distinguishes competing/updated listings at the same address.
    pub fn discriminator(&self) -> String {
        format!("{}-{}", normalize(&self.price), normalize(&self.agent))
    }

    /// The uniqueness boundary: primary key plus discriminator.
    pub fn composite_key(&self) -> String {
        format!("{}|{}", self.primary_key(), self.discriminator())
    }

    /// Shard routing key: first two characters of the normalized postal
    /// code, or the fallback bucket when fewer than two remain.
    pub fn shard_key(&self) -> String {
        let postal = normalize(&self.postal);
        let prefix: String = postal.chars().take(2).collect();
        if prefix.chars().count() < 2 {
            FALLBACK_SHARD.to_string()
        } else {
            prefix
        }
    }

    /// A record is well-formed when address and postal survive trimming.
    pub fn is_well_formed(&self) -> bool {
        !self.address.trim().is_empty() && !self.postal.trim().is_empty()
    }

    /// A row is empty when every field is blank after trimming.
    pub fn is_empty_row(&self) -> bool {
        self.fields().iter().all(|f| f.trim().is_empty())
    }

    /// Fields in persisted column order.
    pub fn fields(&self) -> [&str; 10] {
        [
            &self.date,
            &self.address,
            &self.city,
            &self.state,
            &self.postal,
            &self.agent,
            &self.broker,
            &self.price,
            &self.latitude,
            &self.longitude,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn sample_listing() -> Listing {
        Listing {
            date: "Jan 5, 2026".to_string(),
            address: "1 Main St".to_string(),
            city: "Toronto".to_string(),
            state: "ON".to_string(),
            postal: "M5V3A8".to_string(),
            agent: "Smith".to_string(),
            broker: "Acme Realty".to_string(),
            price: "$800,000".to_string(),
            latitude: "43.6426".to_string(),
            longitude: "-79.3871".to_string(),
        }
    }

    #[test]
    fn primary_key_normalizes_address_and_postal() {
        let mut listing = sample_listing();
        listing.address = "  1 main st ".to_string();
        listing.postal = "m5v3a8".to_string();
        assert_eq!(listing.primary_key(), "1 MAIN ST-M5V3A8");
    }

    #[test]
    fn discriminator_differs_on_price_change() {
        let a = sample_listing();
        let mut b = sample_listing();
        b.price = "$825,000".to_string();
        assert_eq!(a.primary_key(), b.primary_key());
        assert_ne!(a.discriminator(), b.discriminator());
        assert_ne!(a.composite_key(), b.composite_key());
    }

    #[test]
    fn shard_key_takes_postal_prefix() {
        assert_eq!(sample_listing().shard_key(), "M5");
    }

    #[test]
    fn shard_key_falls_back_on_short_postal() {
        let mut listing = sample_listing();
        listing.postal = "7".to_string();
        assert_eq!(listing.shard_key(), FALLBACK_SHARD);
        listing.postal = "  ".to_string();
        assert_eq!(listing.shard_key(), FALLBACK_SHARD);
    }

    #[test]
    fn well_formedness_requires_address_and_postal() {
        let mut listing = sample_listing();
        assert!(listing.is_well_formed());
        listing.address = "  ".to_string();
        assert!(!listing.is_well_formed());
        listing.address = "1 Main St".to_string();
        listing.postal = "".to_string();
        assert!(!listing.is_well_formed());
    }

    #[test]
    fn empty_row_detection() {
        let listing = Listing {
            date: "".into(),
            address: " ".into(),
            city: "".into(),
            state: "".into(),
            postal: "".into(),
            agent: "".into(),
            broker: "".into(),
            price: "".into(),
            latitude: "".into(),
            longitude: "".into(),
        };
        assert!(listing.is_empty_row());
        assert!(!sample_listing().is_empty_row());
    }
}
