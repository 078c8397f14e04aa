//! Restore chain resolution
//!
//! A restore point is reconstructed by extracting the latest full archive at
//! or before it, then every incremental up to and including the point itself.

use crate::error::{BackupError, BackupResult};
use crate::models::{ArtifactKey, ArtifactListing, BackupChain};

/// Resolve the ordered archives needed to restore `target`
///
/// Fails with `ChainNotFound` when the target is not an artifact, is not in
/// the listing, or has no full archive before it.
pub fn resolve(listing: &ArtifactListing, target: &str) -> BackupResult<BackupChain> {
    let target_key =
        ArtifactKey::decode(target).map_err(|_| BackupError::chain_not_found(target))?;

    let candidates = listing
        .artifacts_for(target_key.name())
        .into_iter()
        .filter(|artifact| artifact.timestamp() <= target_key.timestamp());

    let mut chain: Vec<ArtifactKey> = Vec::new();
    for artifact in candidates {
        if artifact.kind().is_full() {
            chain.clear();
            chain.push(artifact);
        } else if !chain.is_empty() {
            chain.push(artifact);
        }
    }

    match chain.iter().position(|artifact| *artifact == target_key) {
        Some(end) => {
            chain.truncate(end + 1);
            Ok(BackupChain::new(chain))
        }
        None => Err(BackupError::chain_not_found(target)),
    }
}

/// Archives a restore of `artifact` needs, itself included
///
/// Empty when the artifact has no chain in the listing.
pub(crate) fn dependencies(listing: &ArtifactListing, artifact: &ArtifactKey) -> Vec<ArtifactKey> {
    resolve(listing, &artifact.key())
        .map(|chain| chain.artifacts().to_vec())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const A_FULL: &str = "A_20250101000000.full.tar.gz";
    const A_INCR1: &str = "A_20250102000000.incr.tar.gz";
    const A_INCR2: &str = "A_20250103000000.incr.tar.gz";
    const B_FULL: &str = "B_20250102120000.full.tar.gz";

    fn listing() -> ArtifactListing {
        ArtifactListing::new([B_FULL, A_INCR2, A_FULL, A_INCR1])
    }

    fn keys(chain: &BackupChain) -> Vec<String> {
        chain.iter().map(|artifact| artifact.key()).collect()
    }

    #[test]
    fn test_resolve_first_incremental() {
        let chain = resolve(&listing(), A_INCR1).unwrap();
        assert_eq!(keys(&chain), vec![A_FULL, A_INCR1]);
        assert_eq!(chain.anchor().key(), A_FULL);
        assert_eq!(chain.target().key(), A_INCR1);
    }

    #[test]
    fn test_resolve_second_incremental() {
        let chain = resolve(&listing(), A_INCR2).unwrap();
        assert_eq!(keys(&chain), vec![A_FULL, A_INCR1, A_INCR2]);
    }

    #[test]
    fn test_resolve_full_alone() {
        let chain = resolve(&listing(), B_FULL).unwrap();
        assert_eq!(keys(&chain), vec![B_FULL]);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_latest_full_anchors() {
        let listing = ArtifactListing::new([
            "A_20250101000000.full.tar.gz",
            "A_20250102000000.incr.tar.gz",
            "A_20250201000000.full.tar.gz",
            "A_20250202000000.incr.tar.gz",
            "A_20250203000000.incr.tar.gz",
        ]);
        let chain = resolve(&listing, "A_20250202000000.incr.tar.gz").unwrap();
        assert_eq!(
            keys(&chain),
            vec!["A_20250201000000.full.tar.gz", "A_20250202000000.incr.tar.gz"]
        );
    }

    #[test]
    fn test_chain_is_monotonic_and_bounded_by_target() {
        let listing = listing();
        for target in [A_FULL, A_INCR1, A_INCR2, B_FULL] {
            let chain = resolve(&listing, target).unwrap();
            let target_ts = chain.target().timestamp();
            assert!(chain
                .artifacts()
                .windows(2)
                .all(|pair| pair[0].timestamp() < pair[1].timestamp()));
            assert!(chain.iter().all(|artifact| artifact.timestamp() <= target_ts));
            assert!(chain.anchor().kind().is_full());
            assert_eq!(chain.iter().filter(|a| a.kind().is_full()).count(), 1);
        }
    }

    #[test]
    fn test_missing_anchor() {
        let listing = ArtifactListing::new([A_INCR1]);
        let err = resolve(&listing, A_INCR1).unwrap_err();
        assert!(err.is_chain_not_found());
    }

    #[test]
    fn test_target_not_in_listing() {
        let listing = ArtifactListing::new([A_FULL, A_INCR1]);
        let err = resolve(&listing, A_INCR2).unwrap_err();
        assert!(err.is_chain_not_found());
    }

    #[test]
    fn test_target_not_an_artifact() {
        let err = resolve(&listing(), "notes.txt").unwrap_err();
        match err {
            BackupError::ChainNotFound { key } => assert_eq!(key, "notes.txt"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_target_predates_any_full() {
        let listing = ArtifactListing::new([
            "A_20241231000000.incr.tar.gz",
            "A_20250101000000.full.tar.gz",
        ]);
        assert!(resolve(&listing, "A_20241231000000.incr.tar.gz").is_err());
    }

    #[test]
    fn test_prefixed_keys() {
        let listing = ArtifactListing::new([
            "backups/A_20250101000000.full.tar.gz.gpg",
            "backups/A_20250102000000.incr.tar.gz.gpg",
        ]);
        let chain = resolve(&listing, "backups/A_20250102000000.incr.tar.gz.gpg").unwrap();
        assert_eq!(chain.len(), 2);
        assert!(chain.iter().all(|artifact| artifact.is_encrypted()));
    }

    #[test]
    fn test_dependencies_of_orphan_are_empty() {
        let listing = ArtifactListing::new([A_INCR1]);
        let orphan = ArtifactKey::decode(A_INCR1).unwrap();
        assert!(dependencies(&listing, &orphan).is_empty());
    }
}
