//! Archive creation and extraction
//!
//! Incremental archives rely on GNU tar's `--listed-incremental` snapshot
//! file, kept per job in the state directory. A full archive starts from an
//! empty snapshot file; each incremental records the changes since the
//! previous archive of the same chain.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::config::settings::BackupJob;
use crate::error::{BackupError, BackupResult};
use crate::models::{ArtifactKey, ArtifactKind, ArtifactTimestamp};

/// Creates and extracts local archive files
pub trait Archiver {
    /// Archive the job's folders into the work directory
    ///
    /// Returns the archive path and the kind actually produced, which is
    /// `Full` when an incremental was requested but no change-tracking state
    /// exists.
    fn create_archive(
        &self,
        job: &BackupJob,
        state_file: &Path,
        kind: ArtifactKind,
        timestamp: ArtifactTimestamp,
    ) -> BackupResult<(PathBuf, ArtifactKind)>;

    /// Extract an archive into `target_dir`
    fn extract(&self, archive: &Path, target_dir: &Path) -> BackupResult<()>;
}

/// GNU tar based archiver
#[derive(Debug, Clone)]
pub struct TarArchiver {
    program: PathBuf,
    work_dir: PathBuf,
}

impl TarArchiver {
    /// Create an archiver writing archives into `work_dir`
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from("tar"),
            work_dir: work_dir.into(),
        }
    }

    /// Use a specific tar binary
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Directory archives are written to
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

/// Remove a change-tracking state file, ignoring a missing one
pub fn reset_state(state_file: &Path) -> BackupResult<()> {
    match std::fs::remove_file(state_file) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BackupError::Archive(format!(
            "Failed to reset snapshot state {}: {}",
            state_file.display(),
            e
        ))),
    }
}

impl Archiver for TarArchiver {
    fn create_archive(
        &self,
        job: &BackupJob,
        state_file: &Path,
        kind: ArtifactKind,
        timestamp: ArtifactTimestamp,
    ) -> BackupResult<(PathBuf, ArtifactKind)> {
        let kind = match kind {
            ArtifactKind::Full => {
                reset_state(state_file)?;
                ArtifactKind::Full
            }
            ArtifactKind::Incremental if !state_file.exists() => {
                warn!(
                    "No snapshot state for '{}' at {}, creating a full archive instead",
                    job.name,
                    state_file.display()
                );
                ArtifactKind::Full
            }
            ArtifactKind::Incremental => ArtifactKind::Incremental,
        };

        let key = ArtifactKey::encode(&job.name, timestamp, kind, false)?;
        let archive_path = self.work_dir.join(key.file_name());

        std::fs::create_dir_all(&self.work_dir).map_err(|e| {
            BackupError::Io(format!("Failed to create work directory: {}", e))
        })?;
        if let Some(parent) = state_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                BackupError::Io(format!("Failed to create state directory: {}", e))
            })?;
        }

        let mut cmd = Command::new(&self.program);
        cmd.arg("-czf")
            .arg(&archive_path)
            .arg(format!("--listed-incremental={}", state_file.display()));
        for pattern in &job.exclude {
            cmd.arg(format!("--exclude={}", pattern));
        }
        cmd.args(&job.folders);

        debug!("Running {:?}", cmd);
        if let Err(e) = crate::command::run(&mut cmd, None) {
            let _ = std::fs::remove_file(&archive_path);
            // A failed run may have left a half-updated snapshot file
            let _ = reset_state(state_file);
            return Err(BackupError::Archive(e));
        }

        Ok((archive_path, kind))
    }

    fn extract(&self, archive: &Path, target_dir: &Path) -> BackupResult<()> {
        std::fs::create_dir_all(target_dir).map_err(|e| {
            BackupError::Io(format!("Failed to create target directory: {}", e))
        })?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("-xzf")
            .arg(archive)
            .arg("--listed-incremental=/dev/null")
            .arg("-C")
            .arg(target_dir);

        debug!("Running {:?}", cmd);
        crate::command::run(&mut cmd, None).map_err(BackupError::Archive)
    }
}
