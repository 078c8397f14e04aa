//! Snapshot of the keys stored under the backup prefix

use serde::{Deserialize, Serialize};

use super::artifact::ArtifactKey;

/// All keys under the storage prefix at one point in time
///
/// A listing is never refreshed in place: every run fetches a new one, and
/// all decisions made during the run are a function of that snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactListing {
    keys: Vec<String>,
}

impl ArtifactListing {
    /// Create a listing from raw storage keys
    pub fn new(keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// An empty listing (used when storage could not be listed)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Raw keys as listed
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Number of raw keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the listing holds no keys at all
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Decoded artifacts, oldest first
    ///
    /// Keys that are not artifacts are skipped. Artifacts with the same
    /// timestamp are ordered by key so the result is deterministic.
    pub fn artifacts(&self) -> Vec<ArtifactKey> {
        let mut artifacts: Vec<ArtifactKey> = self
            .keys
            .iter()
            .filter_map(|key| ArtifactKey::decode(key).ok())
            .collect();
        artifacts.sort_by(|a, b| {
            a.timestamp()
                .cmp(&b.timestamp())
                .then_with(|| a.key().cmp(&b.key()))
        });
        artifacts.dedup();
        artifacts
    }

    /// Decoded artifacts of one job, oldest first
    pub fn artifacts_for(&self, name: &str) -> Vec<ArtifactKey> {
        self.artifacts()
            .into_iter()
            .filter(|artifact| artifact.name() == name)
            .collect()
    }

    /// Keys that are not backup artifacts
    pub fn unrecognized(&self) -> Vec<&str> {
        self.keys
            .iter()
            .filter(|key| ArtifactKey::decode(key).is_err())
            .map(String::as_str)
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ArtifactListing {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
