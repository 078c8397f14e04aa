//! Ordered set of artifacts needed to restore one point in time

use serde::Serialize;

use super::artifact::ArtifactKey;

/// One full archive followed by the incrementals layered on top of it
///
/// A chain is only ever built by the chain resolver, which guarantees it is
/// non-empty, starts with a full, shares one job name, is strictly ordered by
/// timestamp and ends at the requested key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupChain {
    artifacts: Vec<ArtifactKey>,
}

impl BackupChain {
    pub(crate) fn new(artifacts: Vec<ArtifactKey>) -> Self {
        debug_assert!(!artifacts.is_empty());
        Self { artifacts }
    }

    /// The full archive anchoring the chain
    pub fn anchor(&self) -> &ArtifactKey {
        &self.artifacts[0]
    }

    /// The restore point (last element)
    pub fn target(&self) -> &ArtifactKey {
        &self.artifacts[self.artifacts.len() - 1]
    }

    /// Artifacts in restore order
    pub fn artifacts(&self) -> &[ArtifactKey] {
        &self.artifacts
    }

    /// Number of archives to apply
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Iterate in restore order
    pub fn iter(&self) -> std::slice::Iter<'_, ArtifactKey> {
        self.artifacts.iter()
    }
}

impl<'a> IntoIterator for &'a BackupChain {
    type Item = &'a ArtifactKey;
    type IntoIter = std::slice::Iter<'a, ArtifactKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.iter()
    }
}
