//! Artifact display formatting
//!
//! Formats listings, chains and retention plans for terminal output.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::config::settings::{RetentionPolicy, RetentionScope};
use crate::models::{ArtifactKey, ArtifactListing, BackupChain};
use crate::services::RetentionPlan;

#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Job")]
    job: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Encrypted")]
    encrypted: String,
}

impl From<&ArtifactKey> for ArtifactRow {
    fn from(artifact: &ArtifactKey) -> Self {
        Self {
            key: artifact.key(),
            job: artifact.name().to_string(),
            kind: artifact.kind().to_string(),
            created: artifact
                .timestamp()
                .datetime()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            encrypted: if artifact.is_encrypted() { "yes" } else { "no" }.to_string(),
        }
    }
}

fn artifact_table<'a>(artifacts: impl IntoIterator<Item = &'a ArtifactKey>) -> String {
    let rows: Vec<ArtifactRow> = artifacts.into_iter().map(ArtifactRow::from).collect();
    Table::new(rows).with(Style::psql()).to_string()
}

/// Format every recognized artifact of a listing as a table
pub fn format_artifact_list(listing: &ArtifactListing) -> String {
    let artifacts = listing.artifacts();
    let unrecognized = listing.unrecognized().len();

    let mut output = if artifacts.is_empty() {
        "No backups found.\n".to_string()
    } else {
        format!(
            "{}\n\nTotal: {} backup(s)\n",
            artifact_table(&artifacts),
            artifacts.len()
        )
    };

    if unrecognized > 0 {
        output.push_str(&format!(
            "Ignored {} object(s) that are not backup artifacts\n",
            unrecognized
        ));
    }
    output
}

/// Format a restore chain, anchor first
pub fn format_chain(chain: &BackupChain) -> String {
    let mut output = String::new();
    for (i, artifact) in chain.iter().enumerate() {
        output.push_str(&format!("{:>3}. {} ({})\n", i + 1, artifact, artifact.kind()));
    }
    output
}

/// Format a retention plan together with the policy that produced it
pub fn format_retention_plan(plan: &RetentionPlan, policy: &RetentionPolicy) -> String {
    let scope = match policy.scope {
        RetentionScope::Global => "all jobs",
        RetentionScope::PerJob => "per job",
    };

    let mut output = format!(
        "Retention policy: {} daily, {} monthly ({}){}\n",
        policy.daily_count,
        policy.monthly_count,
        scope,
        if policy.protect_chains {
            ", chains protected"
        } else {
            ""
        }
    );
    output.push_str(&format!(
        "Keep: {}, delete: {}\n",
        plan.keep.len(),
        plan.delete.len()
    ));

    if !plan.delete.is_empty() {
        output.push('\n');
        output.push_str(&artifact_table(&plan.delete));
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{chain, select_for_deletion};

    fn listing() -> ArtifactListing {
        ArtifactListing::new([
            "db_20250101000000.full.tar.gz",
            "db_20250102000000.incr.tar.gz.gpg",
            "notes.txt",
        ])
    }

    #[test]
    fn test_format_artifact_list() {
        let output = format_artifact_list(&listing());
        assert!(output.contains("Key"));
        assert!(output.contains("db_20250102000000.incr.tar.gz.gpg"));
        assert!(output.contains("2025-01-02 00:00:00"));
        assert!(output.contains("Total: 2 backup(s)"));
        assert!(output.contains("Ignored 1 object(s)"));
        assert!(!output.contains("notes.txt"));
    }

    #[test]
    fn test_format_empty_list() {
        let output = format_artifact_list(&ArtifactListing::empty());
        assert_eq!(output, "No backups found.\n");
    }

    #[test]
    fn test_format_chain() {
        let chain = chain::resolve(&listing(), "db_20250102000000.incr.tar.gz.gpg").unwrap();
        let output = format_chain(&chain);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("db_20250101000000.full.tar.gz"));
        assert!(lines[1].ends_with("(Incremental)"));
    }

    #[test]
    fn test_format_retention_plan() {
        let policy = RetentionPolicy {
            daily_count: 1,
            monthly_count: 0,
            ..Default::default()
        };
        let plan = select_for_deletion(&listing(), &policy);
        let output = format_retention_plan(&plan, &policy);
        assert!(output.starts_with("Retention policy: 1 daily, 0 monthly (all jobs)"));
        assert!(output.contains("Keep: 1, delete: 1"));
        assert!(output.contains("db_20250101000000.full.tar.gz"));
    }
}
