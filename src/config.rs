// src/config.rs

//! Store configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Row-count limits for shards and the whole store
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Overflow spill behavior
    #[serde(default)]
    pub spill: SpillConfig,

    /// Health scan thresholds
    #[serde(default)]
    pub health: HealthConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_rows_per_shard == 0 {
            return Err(AppError::validation("limits.max_rows_per_shard must be > 0"));
        }
        if self.limits.safe_max_rows == 0 {
            return Err(AppError::validation("limits.safe_max_rows must be > 0"));
        }
        if self.limits.safe_max_rows < self.limits.max_rows_per_shard {
            return Err(AppError::validation(
                "limits.safe_max_rows must be >= limits.max_rows_per_shard",
            ));
        }
        if self.spill.buffer_threshold == 0 {
            return Err(AppError::validation("spill.buffer_threshold must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.health.max_invalid_row_ratio) {
            return Err(AppError::validation(
                "health.max_invalid_row_ratio must be within 0.0..=1.0",
            ));
        }
        if !(0.0..=1.0).contains(&self.health.max_empty_row_ratio) {
            return Err(AppError::validation(
                "health.max_empty_row_ratio must be within 0.0..=1.0",
            ));
        }
        if !(0.0..=1.0).contains(&self.health.capacity_warning_ratio) {
            return Err(AppError::validation(
                "health.capacity_warning_ratio must be within 0.0..=1.0",
            ));
        }
        Ok(())
    }
}

/// Row-count limits enforced during ingestion and rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum rows a single postal shard may hold
    #[serde(default = "defaults::max_rows_per_shard")]
    pub max_rows_per_shard: usize,

    /// Store-wide row ceiling; crossing it mandates a rebuild
    #[serde(default = "defaults::safe_max_rows")]
    pub safe_max_rows: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_rows_per_shard: defaults::max_rows_per_shard(),
            safe_max_rows: defaults::safe_max_rows(),
        }
    }
}

/// Overflow spill settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpillConfig {
    /// Buffered records before a segment is flushed to disk
    #[serde(default = "defaults::buffer_threshold")]
    pub buffer_threshold: usize,

    /// Directory for overflow segment files, relative to the store file
    #[serde(default = "defaults::spill_dir")]
    pub spill_dir: String,
}

impl Default for SpillConfig {
    fn default() -> Self {
        Self {
            buffer_threshold: defaults::buffer_threshold(),
            spill_dir: defaults::spill_dir(),
        }
    }
}

/// Thresholds used by the health scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Per-shard ratio of invalid to valid rows before the shard is flagged
    #[serde(default = "defaults::max_invalid_row_ratio")]
    pub max_invalid_row_ratio: f64,

    /// Store-wide ratio of fully-empty rows before the store is flagged
    #[serde(default = "defaults::max_empty_row_ratio")]
    pub max_empty_row_ratio: f64,

    /// Fraction of safe_max_rows at which the capacity warning fires
    #[serde(default = "defaults::capacity_warning_ratio")]
    pub capacity_warning_ratio: f64,

    /// Rows per shard above which the shard is reported oversized
    #[serde(default = "defaults::safe_max_rows_per_shard")]
    pub safe_max_rows_per_shard: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_invalid_row_ratio: defaults::max_invalid_row_ratio(),
            max_empty_row_ratio: defaults::max_empty_row_ratio(),
            capacity_warning_ratio: defaults::capacity_warning_ratio(),
            safe_max_rows_per_shard: defaults::safe_max_rows_per_shard(),
        }
    }
}

mod defaults {
    // Limits defaults
    pub fn max_rows_per_shard() -> usize {
        5_000
    }
    pub fn safe_max_rows() -> usize {
        50_000
    }

    // Spill defaults
    pub fn buffer_threshold() -> usize {
        250
    }
    pub fn spill_dir() -> String {
        "spill".into()
    }

    // Health defaults
    pub fn max_invalid_row_ratio() -> f64 {
        0.10
    }
    pub fn max_empty_row_ratio() -> f64 {
        0.05
    }
    pub fn capacity_warning_ratio() -> f64 {
        0.80
    }
    pub fn safe_max_rows_per_shard() -> usize {
        5_000
    }
}
