//! Retention and rotation of stored artifacts
//!
//! The keep-set is the union of two independently computed candidate sets:
//! the last artifact of each of the most recent month-buckets, and the most
//! recent artifacts overall. Everything else in the listing is deleted.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{error, info, warn};

use super::chain;
use super::deadline::Deadline;
use crate::config::settings::{RetentionPolicy, RetentionScope};
use crate::error::{BackupError, BackupResult};
use crate::models::{ArtifactKey, ArtifactListing, MonthBucket};
use crate::storage::ArtifactStore;

/// Which artifacts survive a rotation and which are deleted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Artifacts kept, oldest first
    pub keep: Vec<ArtifactKey>,
    /// Artifacts to delete, oldest first
    pub delete: Vec<ArtifactKey>,
}

impl RetentionPlan {
    /// Whether the plan deletes nothing
    pub fn is_noop(&self) -> bool {
        self.delete.is_empty()
    }
}

/// Outcome of applying a retention plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationReport {
    /// Number of artifacts kept
    pub kept: usize,
    /// Keys deleted successfully
    pub deleted: Vec<String>,
    /// Keys whose deletion failed, with the error
    pub failures: Vec<(String, String)>,
    /// Keys not attempted because the deadline passed
    pub skipped: Vec<String>,
}

impl RotationReport {
    /// Failure descriptions suitable for a run report
    pub fn failure_messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = self
            .failures
            .iter()
            .map(|(key, err)| format!("delete {}: {}", key, err))
            .collect();
        if !self.skipped.is_empty() {
            messages.push(format!(
                "retention stopped at deadline, {} deletion(s) not attempted",
                self.skipped.len()
            ));
        }
        messages
    }

    /// Whether every planned deletion succeeded
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}

/// Compute which artifacts of `listing` to keep and which to delete
///
/// Keys that are not artifacts are neither kept nor deleted.
pub fn select_for_deletion(listing: &ArtifactListing, policy: &RetentionPolicy) -> RetentionPlan {
    let artifacts = listing.artifacts();
    if artifacts.is_empty() {
        return RetentionPlan::default();
    }

    let mut keep: BTreeSet<String> = BTreeSet::new();
    match policy.scope {
        RetentionScope::Global => keep.extend(keep_set(&artifacts, policy)),
        RetentionScope::PerJob => {
            let mut by_job: BTreeMap<&str, Vec<ArtifactKey>> = BTreeMap::new();
            for artifact in &artifacts {
                by_job
                    .entry(artifact.name())
                    .or_default()
                    .push(artifact.clone());
            }
            for group in by_job.values() {
                keep.extend(keep_set(group, policy));
            }
        }
    }

    if policy.protect_chains {
        let kept_incrementals: Vec<ArtifactKey> = artifacts
            .iter()
            .filter(|artifact| !artifact.kind().is_full() && keep.contains(&artifact.key()))
            .cloned()
            .collect();
        for artifact in &kept_incrementals {
            keep.extend(
                chain::dependencies(listing, artifact)
                    .iter()
                    .map(ArtifactKey::key),
            );
        }
    }

    let (keep, delete): (Vec<ArtifactKey>, Vec<ArtifactKey>) = artifacts
        .into_iter()
        .partition(|artifact| keep.contains(&artifact.key()));
    RetentionPlan { keep, delete }
}

/// Keys kept under the monthly and daily quotas, `artifacts` sorted oldest first
fn keep_set(artifacts: &[ArtifactKey], policy: &RetentionPolicy) -> BTreeSet<String> {
    let mut last_in_month: BTreeMap<MonthBucket, &ArtifactKey> = BTreeMap::new();
    for artifact in artifacts {
        last_in_month.insert(artifact.timestamp().month_bucket(), artifact);
    }

    let monthly = last_in_month
        .values()
        .rev()
        .take(policy.monthly_count as usize)
        .map(|artifact| artifact.key());

    let daily = artifacts
        .iter()
        .rev()
        .take(policy.daily_count as usize)
        .map(ArtifactKey::key);

    monthly.chain(daily).collect()
}

/// Applies a retention policy to an artifact store
pub struct RetentionEngine<'a, S: ArtifactStore + ?Sized> {
    store: &'a S,
    policy: &'a RetentionPolicy,
}

impl<'a, S: ArtifactStore + ?Sized> RetentionEngine<'a, S> {
    /// Create an engine over `store`
    pub fn new(store: &'a S, policy: &'a RetentionPolicy) -> Self {
        Self { store, policy }
    }

    /// List the store and compute the plan without deleting anything
    pub fn plan(&self) -> BackupResult<RetentionPlan> {
        let listing = self
            .store
            .list()
            .map_err(|e| BackupError::ListingUnavailable(e.to_string()))?;
        Ok(select_for_deletion(&listing, self.policy))
    }

    /// List, plan and delete
    pub fn rotate(&self, deadline: &Deadline) -> BackupResult<RotationReport> {
        let plan = self.plan()?;
        Ok(self.apply(&plan, deadline))
    }

    /// Delete every artifact the plan selects
    ///
    /// A failed deletion is recorded and the remaining keys are still tried.
    /// Once the deadline has passed no further deletion is started.
    pub fn apply(&self, plan: &RetentionPlan, deadline: &Deadline) -> RotationReport {
        let mut report = RotationReport {
            kept: plan.keep.len(),
            ..Default::default()
        };

        if plan.is_noop() {
            info!("Retention: keeping {} artifact(s), nothing to delete", report.kept);
            return report;
        }

        info!(
            "Retention: keeping {} artifact(s), deleting {}",
            plan.keep.len(),
            plan.delete.len()
        );

        for artifact in &plan.delete {
            let key = artifact.key();
            if deadline.is_expired() {
                report.skipped.push(key);
                continue;
            }

            match self.store.delete(&key) {
                Ok(()) => {
                    info!("Deleted old backup {}", key);
                    report.deleted.push(key);
                }
                Err(e) => {
                    error!("Failed to delete {}: {}", key, e);
                    report.failures.push((key, e.to_string()));
                }
            }
        }

        if !report.skipped.is_empty() {
            warn!(
                "Deadline passed, skipped {} deletion(s)",
                report.skipped.len()
            );
        }

        report
    }
}
