//! Path management for backup-service
//!
//! The service keeps one piece of local state per job: the archiver's
//! change-tracking snapshot file, which incremental archives are computed
//! against.
//!
//! ## Path Resolution Order
//!
//! 1. `BACKUP_SERVICE_DATA_DIR` environment variable (if set)
//! 2. The platform data directory (`~/.local/share/backup-service` on Linux)

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::{BackupError, BackupResult};
use crate::models::validate_name;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "BACKUP_SERVICE_DATA_DIR";

/// Manages the local paths used by backup-service
#[derive(Debug, Clone)]
pub struct ServicePaths {
    base_dir: PathBuf,
}

impl ServicePaths {
    /// Resolve the data directory from the environment or the platform
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> BackupResult<Self> {
        let base_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => ProjectDirs::from("", "", "backup-service")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| {
                    BackupError::Config("Could not determine a data directory".into())
                })?,
        };

        Ok(Self { base_dir })
    }

    /// Create ServicePaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding the archiver's per-job snapshot files
    pub fn state_dir(&self) -> PathBuf {
        self.base_dir.join("state")
    }

    /// Snapshot file for one job
    pub fn state_file(&self, job: &str) -> BackupResult<PathBuf> {
        validate_name(job)?;
        Ok(self.state_dir().join(format!("{}.snar", job)))
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> BackupResult<()> {
        std::fs::create_dir_all(self.state_dir())
            .map_err(|e| BackupError::Io(format!("Failed to create state directory: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ServicePaths::with_base_dir(temp_dir.path());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.state_dir(), temp_dir.path().join("state"));
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();

        std::env::set_var(DATA_DIR_ENV, temp_dir.path());
        let paths = ServicePaths::new().unwrap();
        std::env::remove_var(DATA_DIR_ENV);

        assert_eq!(paths.base_dir(), temp_dir.path());
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ServicePaths::with_base_dir(temp_dir.path().join("nested"));

        paths.ensure_directories().unwrap();
        assert!(paths.state_dir().exists());
    }

    #[test]
    fn test_state_file() {
        let paths = ServicePaths::with_base_dir("/var/lib/backup-service");
        assert_eq!(
            paths.state_file("db").unwrap(),
            PathBuf::from("/var/lib/backup-service/state/db.snar")
        );
        assert!(paths.state_file("../etc").is_err());
    }
}
