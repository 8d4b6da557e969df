//! Store health validation.
//!
//! Scans a loaded store and reports structural findings: oversized shards,
//! shards with too many malformed rows, an excess of fully-empty rows, and
//! proximity to the store-wide row ceiling. The scan never mutates the
//! store; remediation is the rebuilder's job.

use std::path::Path;

use crate::config::{Config, HealthConfig};
use crate::error::{AppError, Result};
use crate::models::HealthReport;
use crate::storage::{ShardedStore, StoreBackend, format};

/// Validator holding the scan thresholds.
#[derive(Debug, Clone)]
pub struct HealthValidator {
    config: HealthConfig,
    safe_max_rows: usize,
}

impl HealthValidator {
    /// Create a validator from the store configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.health.clone(),
            safe_max_rows: config.limits.safe_max_rows,
        }
    }

    /// Scan an in-memory store.
    pub fn scan(&self, store: &ShardedStore) -> HealthReport {
        let mut report = HealthReport {
            total_shards: store.shard_count(),
            total_rows: store.total_rows(),
            ..HealthReport::default()
        };

        if store.shard_count() == 0 {
            report.issues.push("no shards".to_string());
        }

        for shard in store.shards() {
            let mut shard_flagged = false;

            if shard.len() > self.config.safe_max_rows_per_shard {
                report.issues.push(format!(
                    "shard {} oversized: {} rows (limit {})",
                    shard.key(),
                    shard.len(),
                    self.config.safe_max_rows_per_shard
                ));
                shard_flagged = true;
            }

            let invalid = shard.rows().iter().filter(|r| !r.is_well_formed()).count();
            let empty = shard.rows().iter().filter(|r| r.is_empty_row()).count();
            let valid = shard.len() - invalid;

            if invalid as f64 > self.config.max_invalid_row_ratio * valid as f64 {
                report.issues.push(format!(
                    "shard {} has {} invalid row(s) against {} valid",
                    shard.key(),
                    invalid,
                    valid
                ));
                shard_flagged = true;
            }

            report.invalid_rows += invalid;
            report.empty_rows += empty;
            if shard_flagged {
                report.corrupted_shards += 1;
            }
        }

        if report.empty_rows as f64 > self.config.max_empty_row_ratio * report.total_rows as f64 {
            report.issues.push(format!(
                "{} empty row(s) out of {}",
                report.empty_rows, report.total_rows
            ));
        }

        // Non-fatal warning, but still a finding.
        let capacity_warn =
            (self.config.capacity_warning_ratio * self.safe_max_rows as f64) as usize;
        if report.total_rows > capacity_warn {
            report.issues.push(format!(
                "approaching capacity: {} of {} rows",
                report.total_rows, self.safe_max_rows
            ));
        }

        if report.is_healthy() {
            log::info!(
                "Health scan: OK ({} shards, {} rows)",
                report.total_shards,
                report.total_rows
            );
        } else {
            log::warn!(
                "Health scan: {} issue(s) found across {} shards",
                report.issues.len(),
                report.total_shards
            );
        }
        report
    }

    /// Scan a persisted store identity: load raw, then scan.
    ///
    /// A missing file scans as an empty store ("no shards"); a file that
    /// cannot be parsed is surfaced as [`AppError::StoreCorrupted`].
    pub async fn scan_path(&self, backend: &dyn StoreBackend, path: &Path) -> Result<HealthReport> {
        let store = load_store(backend, path, usize::MAX).await?;
        Ok(self.scan(&store))
    }
}

/// Raw-load a persisted store (no dedup, no capacity enforcement).
pub async fn load_store(
    backend: &dyn StoreBackend,
    path: &Path,
    max_rows_per_shard: usize,
) -> Result<ShardedStore> {
    let raw = match backend.read_bytes_optional(path).await? {
        Some(bytes) => {
            let content = String::from_utf8(bytes)
                .map_err(|e| AppError::corrupted(path.display().to_string(), e))?;
            format::parse_store(&content)?
        }
        None => Vec::new(),
    };
    Ok(ShardedStore::from_raw(raw, max_rows_per_shard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Listing;

    fn listing(address: &str, postal: &str) -> Listing {
        Listing {
            date: "Jan 5, 2026".into(),
            address: address.into(),
            city: "Toronto".into(),
            state: "ON".into(),
            postal: postal.into(),
            agent: "Smith".into(),
            broker: "Acme Realty".into(),
            price: "$800,000".into(),
            latitude: "N/A".into(),
            longitude: "N/A".into(),
        }
    }

    fn blank_listing() -> Listing {
        Listing {
            date: "".into(),
            address: "".into(),
            city: "".into(),
            state: "".into(),
            postal: "".into(),
            agent: "".into(),
            broker: "".into(),
            price: "".into(),
            latitude: "".into(),
            longitude: "".into(),
        }
    }

    fn validator() -> HealthValidator {
        HealthValidator::new(&Config::default())
    }

    #[test]
    fn empty_store_reports_no_shards() {
        let store = ShardedStore::new(10);
        let report = validator().scan(&store);
        assert!(!report.is_healthy());
        assert_eq!(report.issues, vec!["no shards".to_string()]);
    }

    #[test]
    fn clean_store_is_healthy() {
        let mut store = ShardedStore::new(100);
        for i in 0..20 {
            store.try_append(listing(&format!("{i} Main St"), "M5V3A8"));
        }
        let report = validator().scan(&store);
        assert!(report.is_healthy());
        assert_eq!(report.total_rows, 20);
        assert_eq!(report.total_shards, 1);
    }

    #[test]
    fn oversized_shard_is_flagged() {
        let mut config = Config::default();
        config.health.safe_max_rows_per_shard = 3;
        let validator = HealthValidator::new(&config);

        let mut store = ShardedStore::new(100);
        for i in 0..5 {
            store.try_append(listing(&format!("{i} Main St"), "M5V3A8"));
        }

        let report = validator.scan(&store);
        assert_eq!(report.corrupted_shards, 1);
        assert!(report.issues.iter().any(|i| i.contains("M5")));
    }

    #[test]
    fn too_many_invalid_rows_flag_the_shard() {
        // 5 valid + 1 invalid in one shard: 1 > 0.10 * 5.
        let raw = vec![(
            "M5".to_string(),
            vec![
                listing("1 Main St", "M5V3A8"),
                listing("2 Main St", "M5V3A8"),
                listing("3 Main St", "M5V3A8"),
                listing("4 Main St", "M5V3A8"),
                listing("5 Main St", "M5V3A8"),
                listing("", "M5V3A8"),
            ],
        )];
        let store = ShardedStore::from_raw(raw, 100);

        let report = validator().scan(&store);
        assert_eq!(report.invalid_rows, 1);
        assert!(report.issues.iter().any(|i| i.contains("invalid")));
    }

    #[test]
    fn excess_empty_rows_is_a_store_wide_issue() {
        let mut rows: Vec<Listing> = (0..10)
            .map(|i| listing(&format!("{i} Main St"), "M5V3A8"))
            .collect();
        rows.push(blank_listing()); // 1 of 11 > 5%
        let store = ShardedStore::from_raw(vec![("M5".to_string(), rows)], 100);

        let report = validator().scan(&store);
        assert_eq!(report.empty_rows, 1);
        assert!(report.issues.iter().any(|i| i.contains("empty")));
    }

    #[test]
    fn approaching_capacity_warns() {
        let mut config = Config::default();
        config.limits.safe_max_rows = 10;
        config.health.safe_max_rows_per_shard = 100;
        let validator = HealthValidator::new(&config);

        let mut store = ShardedStore::new(100);
        for i in 0..9 {
            store.try_append(listing(&format!("{i} Main St"), "M5V3A8"));
        }

        let report = validator.scan(&store);
        assert!(
            report
                .issues
                .iter()
                .any(|i| i.contains("approaching capacity"))
        );
    }

    #[tokio::test]
    async fn scan_path_on_missing_file_reports_no_shards() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = crate::storage::LocalBackend::new();
        let report = validator()
            .scan_path(&backend, &tmp.path().join("missing.store"))
            .await
            .unwrap();
        assert!(report.issues.contains(&"no shards".to_string()));
    }

    #[tokio::test]
    async fn scan_path_surfaces_parse_failure() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = crate::storage::LocalBackend::new();
        let path = tmp.path().join("garbage.store");
        backend
            .write_bytes_atomic(&path, b"not\ta\tstore\n")
            .await
            .unwrap();

        let result = validator().scan_path(&backend, &path).await;
        assert!(matches!(result, Err(AppError::StoreCorrupted { .. })));
    }
}
