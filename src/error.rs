// src/error.rs

//! Unified error handling for the listing store.

use std::fmt;

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store file could not be parsed
    #[error("Store corrupted at {context}: {message}")]
    StoreCorrupted { context: String, message: String },

    /// Another session already owns this store identity
    #[error("Store is locked by another session: {0}")]
    StoreLocked(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a store corruption error with context.
    pub fn corrupted(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::StoreCorrupted {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
