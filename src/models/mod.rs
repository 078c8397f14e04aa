//! Core data models for backup-service
//!
//! This module contains the data structures the decision logic works on:
//! artifact keys and their timestamps, storage listings and restore chains.

pub mod artifact;
pub mod chain;
pub mod listing;
pub mod timestamp;

pub use artifact::{validate_name, ArtifactKey, ArtifactKind};
pub use chain::BackupChain;
pub use listing::ArtifactListing;
pub use timestamp::{ArtifactTimestamp, MonthBucket};
