//! Storage layer for backup-service
//!
//! The decision logic only ever sees an [`ArtifactListing`]; everything that
//! touches the object store goes through the [`ArtifactStore`] trait so the
//! orchestration can be exercised against fakes.

pub mod object;

pub use object::ObjectArtifactStore;

use std::path::Path;

use crate::error::BackupResult;
use crate::models::ArtifactListing;

/// Object store primitives used by backup, retention and restore
pub trait ArtifactStore {
    /// List every key under the configured prefix
    fn list(&self) -> BackupResult<ArtifactListing>;

    /// Upload a local file under the configured prefix, keyed by its file name
    ///
    /// Returns the key it was stored under.
    fn upload(&self, local_path: &Path) -> BackupResult<String>;

    /// Download `key` to `local_path`, replacing any existing file
    fn download(&self, key: &str, local_path: &Path) -> BackupResult<()>;

    /// Delete one key
    fn delete(&self, key: &str) -> BackupResult<()>;
}
