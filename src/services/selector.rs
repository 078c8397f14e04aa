//! Snapshot type selection
//!
//! Incremental chains never cross a calendar-month boundary: the first run of
//! each month for a job produces a full archive, later runs that month build on
//! it. This bounds how many archives a restore has to apply.

use crate::models::{ArtifactKind, ArtifactListing, ArtifactTimestamp};

/// Decide whether the next archive for `name` must be full
///
/// An empty listing (including one substituted after a failed list call)
/// means no full exists this month, so the result is `Full`.
pub fn decide(
    name: &str,
    force_full: bool,
    listing: &ArtifactListing,
    now: ArtifactTimestamp,
) -> ArtifactKind {
    if force_full {
        return ArtifactKind::Full;
    }

    let current_month = now.month_bucket();
    let has_full_this_month = listing.artifacts().iter().any(|artifact| {
        artifact.name() == name
            && artifact.kind().is_full()
            && artifact.timestamp().month_bucket() == current_month
    });

    if has_full_this_month {
        ArtifactKind::Incremental
    } else {
        ArtifactKind::Full
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> ArtifactTimestamp {
        ArtifactTimestamp::parse("20250315120000").unwrap()
    }

    #[test]
    fn test_full_this_month_allows_incremental() {
        let listing = ArtifactListing::new([
            "X_20250301000000.full.tar.gz",
            "X_20250302000000.incr.tar.gz",
        ]);
        assert_eq!(decide("X", false, &listing, now()), ArtifactKind::Incremental);
    }

    #[test]
    fn test_no_full_this_month_requires_full() {
        let listing = ArtifactListing::new([
            "X_20250228000000.full.tar.gz",
            "X_20250301000000.incr.tar.gz",
        ]);
        assert_eq!(decide("X", false, &listing, now()), ArtifactKind::Full);
    }

    #[test]
    fn test_other_jobs_fulls_do_not_count() {
        let listing = ArtifactListing::new(["Y_20250301000000.full.tar.gz"]);
        assert_eq!(decide("X", false, &listing, now()), ArtifactKind::Full);
    }

    #[test]
    fn test_same_month_previous_year_does_not_count() {
        let listing = ArtifactListing::new(["X_20240310000000.full.tar.gz"]);
        assert_eq!(decide("X", false, &listing, now()), ArtifactKind::Full);
    }

    #[test]
    fn test_encrypted_full_counts() {
        let listing = ArtifactListing::new(["backups/X_20250301000000.full.tar.gz.gpg"]);
        assert_eq!(decide("X", false, &listing, now()), ArtifactKind::Incremental);
    }

    #[test]
    fn test_force_full_wins() {
        let listing = ArtifactListing::new(["X_20250301000000.full.tar.gz"]);
        assert_eq!(decide("X", true, &listing, now()), ArtifactKind::Full);
        assert_eq!(
            decide("X", true, &ArtifactListing::empty(), now()),
            ArtifactKind::Full
        );
    }

    #[test]
    fn test_empty_listing_fails_open_to_full() {
        assert_eq!(
            decide("X", false, &ArtifactListing::empty(), now()),
            ArtifactKind::Full
        );
    }

    #[test]
    fn test_foreign_keys_ignored() {
        let listing = ArtifactListing::new(["X_20250301000000.tar.gz", "X.full"]);
        assert_eq!(decide("X", false, &listing, now()), ArtifactKind::Full);
    }
}
