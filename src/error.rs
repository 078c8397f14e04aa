//! Custom error types for backup-service
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for backup-service operations
#[derive(Error, Debug)]
pub enum BackupError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(String),

    /// A key that does not follow the artifact naming scheme
    #[error("Not a backup artifact: {0}")]
    NotAnArtifact(String),

    /// Invalid logical backup name
    #[error("Invalid backup name '{0}': must be non-empty and contain no '/', '_' or '.'")]
    InvalidName(String),

    /// No full backup anchors the requested restore point
    #[error("No backup chain found for {key}")]
    ChainNotFound { key: String },

    /// The object store listing could not be fetched
    #[error("Listing unavailable: {0}")]
    ListingUnavailable(String),

    /// Object store errors (upload, download, delete)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Archive creation or extraction errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// Encryption errors
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notify(String),

    /// The run deadline passed before the next step could start
    #[error("Deadline exceeded before {0}")]
    DeadlineExceeded(String),

    /// A run that attempted everything but had failures along the way
    #[error("Completed with {} error(s): {}", failures.len(), failures.join("; "))]
    RunFailed { failures: Vec<String> },
}

impl BackupError {
    /// Create a "chain not found" error for a restore target
    pub fn chain_not_found(key: impl Into<String>) -> Self {
        Self::ChainNotFound { key: key.into() }
    }

    /// Check if this is a "chain not found" error
    pub fn is_chain_not_found(&self) -> bool {
        matches!(self, Self::ChainNotFound { .. })
    }

    /// Check if this error only means "skip this key"
    pub fn is_not_an_artifact(&self) -> bool {
        matches!(self, Self::NotAnArtifact(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for BackupError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

impl From<object_store::Error> for BackupError {
    fn from(err: object_store::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for BackupError {
    fn from(err: reqwest::Error) -> Self {
        Self::Notify(err.to_string())
    }
}

/// Result type alias for backup-service operations
pub type BackupResult<T> = Result<T, BackupError>;
