//! Service settings for backup-service
//!
//! Settings are read from a YAML file: storage location, the backup jobs,
//! encryption, retention policy and notification settings.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::crypto::SecureString;
use crate::error::{BackupError, BackupResult};
use crate::models::validate_name;

/// Which object store implementation to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// S3 or an S3-compatible service (default)
    #[default]
    S3,
    /// A directory on the local filesystem
    Local,
}

/// Object storage settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Storage implementation
    pub backend: StorageBackend,
    /// Bucket name (S3)
    pub bucket: String,
    /// Region (S3)
    pub region: String,
    /// Custom endpoint for S3-compatible services
    pub endpoint: String,
    /// Access key id; falls back to `AWS_ACCESS_KEY_ID` when empty
    pub access_key_id: String,
    /// Secret access key; falls back to `AWS_SECRET_ACCESS_KEY` when empty
    pub secret_access_key: String,
    /// Key prefix all artifacts live under
    pub prefix: String,
    /// Root directory (local backend)
    pub local_dir: Option<PathBuf>,
}

/// One logical backup job
#[derive(Debug, Clone, Deserialize)]
pub struct BackupJob {
    /// Logical name, used in artifact keys
    pub name: String,
    /// Paths to archive
    pub folders: Vec<PathBuf>,
    /// Exclude patterns passed to the archiver
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Encryption settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EncryptionSettings {
    /// Whether archives are encrypted before upload
    pub enabled: bool,
    /// Symmetric passphrase; prompted for when missing
    pub passphrase: Option<SecureString>,
}

/// Whether retention quotas apply to all jobs together or to each job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetentionScope {
    /// Daily and monthly quotas count artifacts of every job together
    #[default]
    Global,
    /// Each job gets its own daily and monthly quotas
    PerJob,
}

/// Backup retention policy
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionPolicy {
    /// Number of most recent artifacts to keep
    #[serde(rename = "daily", default = "default_daily_count")]
    pub daily_count: u32,
    /// Number of most recent months whose last artifact is kept
    #[serde(rename = "monthly", default = "default_monthly_count")]
    pub monthly_count: u32,
    /// Quota scope
    #[serde(default)]
    pub scope: RetentionScope,
    /// Keep every archive a kept incremental depends on
    #[serde(default)]
    pub protect_chains: bool,
}

fn default_daily_count() -> u32 {
    10
}

fn default_monthly_count() -> u32 {
    1
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            daily_count: default_daily_count(),
            monthly_count: default_monthly_count(),
            scope: RetentionScope::default(),
            protect_chains: false,
        }
    }
}

/// Telegram notification settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    /// Whether to send a message after each backup run
    pub enabled: bool,
    /// Bot API token
    pub bot_token: String,
    /// Target chat id
    pub chat_id: String,
}

/// Settings for backup-service
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Object storage
    #[serde(alias = "s3", default)]
    pub storage: StorageSettings,

    /// Backup jobs, run in order
    #[serde(default)]
    pub backups: Vec<BackupJob>,

    /// Archive encryption
    #[serde(default)]
    pub encryption: EncryptionSettings,

    /// Retention policy
    #[serde(default)]
    pub retention: RetentionPolicy,

    /// Notifications
    #[serde(default)]
    pub telegram: TelegramSettings,

    /// Cron expression for the external scheduler (informational)
    #[serde(default = "default_schedule")]
    pub schedule: String,

    /// Stop starting new steps once a run has taken this long
    #[serde(default, with = "humantime_serde")]
    pub run_timeout: Option<Duration>,

    /// Where temporary archives are written (defaults to the system temp dir)
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

fn default_schedule() -> String {
    "0 0 * * *".to_string()
}

impl Settings {
    /// Load and validate settings from a YAML file
    pub fn load(path: &Path) -> BackupResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BackupError::Io(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&contents)
    }

    /// Parse and validate settings from YAML text
    pub fn from_yaml(contents: &str) -> BackupResult<Self> {
        let settings: Settings = serde_yaml::from_str(contents)?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings for values that would fail later at run time
    pub fn validate(&self) -> BackupResult<()> {
        let mut seen = HashSet::new();
        for job in &self.backups {
            validate_name(&job.name)?;
            if !seen.insert(job.name.as_str()) {
                return Err(BackupError::Config(format!(
                    "Duplicate backup name '{}'",
                    job.name
                )));
            }
            if job.folders.is_empty() {
                return Err(BackupError::Config(format!(
                    "Backup '{}' has no folders",
                    job.name
                )));
            }
        }

        match self.storage.backend {
            StorageBackend::S3 if self.storage.bucket.is_empty() => {
                return Err(BackupError::Config(
                    "storage.bucket is required for the s3 backend".into(),
                ));
            }
            StorageBackend::Local if self.storage.local_dir.is_none() => {
                return Err(BackupError::Config(
                    "storage.local_dir is required for the local backend".into(),
                ));
            }
            _ => {}
        }

        if self.telegram.enabled
            && (self.telegram.bot_token.is_empty() || self.telegram.chat_id.is_empty())
        {
            return Err(BackupError::Config(
                "telegram.bot_token and telegram.chat_id are required when telegram is enabled"
                    .into(),
            ));
        }

        Ok(())
    }

    /// Directory temporary archives are written to
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("backup-service"))
    }
}
