//! Scheduled backup runs
//!
//! A run archives every configured job, uploads the results, rotates old
//! artifacts and sends one notification. Every job and the retention step are
//! attempted even when earlier ones fail; failures are collected into the
//! [`RunReport`].

use std::path::Path;

use tracing::{error, info, warn};

use crate::archive::{self, Archiver};
use crate::config::paths::ServicePaths;
use crate::config::settings::{BackupJob, Settings};
use crate::crypto::{Cipher, SecureString};
use crate::error::{BackupError, BackupResult};
use crate::models::{ArtifactKind, ArtifactListing, ArtifactTimestamp};
use crate::notify::{self, Notifier, NullNotifier};
use crate::services::{selector, Deadline, RetentionEngine, RotationReport};
use crate::storage::ArtifactStore;

/// Outcome of one backup run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Keys uploaded, in job order
    pub uploaded: Vec<String>,
    /// Degraded conditions that did not fail the run
    pub warnings: Vec<String>,
    /// Everything that failed
    pub failures: Vec<String>,
    /// Retention outcome, when rotation ran
    pub rotation: Option<RotationReport>,
}

impl RunReport {
    /// Whether the run completed without failures
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Text of the run notification
    pub fn message(&self) -> String {
        if self.is_success() {
            return "✅ Backup completed successfully".to_string();
        }
        let mut msg = String::from("❌ Backup Failed:\n");
        for failure in &self.failures {
            msg.push_str(&format!("- {}\n", failure));
        }
        msg
    }

    /// Convert a run with failures into `RunFailed`
    pub fn into_result(self) -> BackupResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(BackupError::RunFailed {
                failures: self.failures,
            })
        }
    }
}

/// Runs every configured backup job followed by retention
pub struct BackupRunner<'a> {
    settings: &'a Settings,
    paths: &'a ServicePaths,
    store: &'a dyn ArtifactStore,
    archiver: &'a dyn Archiver,
    encryption: Option<(&'a dyn Cipher, SecureString)>,
    notifier: &'a dyn Notifier,
}

impl<'a> BackupRunner<'a> {
    /// Create a runner without encryption or notifications
    pub fn new(
        settings: &'a Settings,
        paths: &'a ServicePaths,
        store: &'a dyn ArtifactStore,
        archiver: &'a dyn Archiver,
    ) -> Self {
        Self {
            settings,
            paths,
            store,
            archiver,
            encryption: None,
            notifier: &NullNotifier,
        }
    }

    /// Encrypt archives with `cipher` before upload
    pub fn with_encryption(mut self, cipher: &'a dyn Cipher, passphrase: SecureString) -> Self {
        self.encryption = Some((cipher, passphrase));
        self
    }

    /// Report each run through `notifier`
    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Run all jobs now
    pub fn run(&self, force_full: bool, deadline: &Deadline) -> RunReport {
        self.run_at(force_full, ArtifactTimestamp::now(), deadline)
    }

    /// Run all jobs, stamping archives with `now`
    pub fn run_at(&self, force_full: bool, now: ArtifactTimestamp, deadline: &Deadline) -> RunReport {
        let mut report = RunReport::default();

        for (index, job) in self.settings.backups.iter().enumerate() {
            if let Err(e) = deadline.check(format!("backup {}", job.name)) {
                let remaining = self.settings.backups.len() - index;
                warn!("{}, {} job(s) not started", e, remaining);
                report
                    .failures
                    .push(format!("{} ({} job(s) not started)", e, remaining));
                break;
            }

            info!("Backing up {}...", job.name);
            match self.run_job(job, force_full, now, &mut report) {
                Ok(key) => {
                    info!("Uploaded {}", key);
                    report.uploaded.push(key);
                }
                Err(e) => {
                    error!("Backup {} failed: {}", job.name, e);
                    report
                        .failures
                        .push(format!("backup {} failed: {}", job.name, e));
                }
            }
        }

        self.rotate(deadline, &mut report);

        if self.settings.telegram.enabled {
            notify::notify(self.notifier, &report.message());
        }

        report
    }

    fn run_job(
        &self,
        job: &BackupJob,
        force_full: bool,
        now: ArtifactTimestamp,
        report: &mut RunReport,
    ) -> BackupResult<String> {
        let listing = match self.store.list() {
            Ok(listing) => listing,
            Err(e) => {
                warn!(
                    "Could not list storage for {}, creating a full archive: {}",
                    job.name, e
                );
                report
                    .warnings
                    .push(format!("listing unavailable for {}: {}", job.name, e));
                ArtifactListing::empty()
            }
        };

        let kind = selector::decide(&job.name, force_full, &listing, now);
        let state_file = self.paths.state_file(&job.name)?;
        let (archive_path, kind) = self.archiver.create_archive(job, &state_file, kind, now)?;
        if kind == ArtifactKind::Full {
            info!("Created full archive {}", archive_path.display());
        } else {
            info!("Created incremental archive {}", archive_path.display());
        }

        // Anything that fails from here on leaves an archive the next
        // incremental would depend on but storage never received
        self.encrypt_and_upload(&archive_path).map_err(|e| {
            if let Err(reset) = archive::reset_state(&state_file) {
                warn!("{}", reset);
            }
            e
        })
    }

    fn encrypt_and_upload(&self, archive_path: &Path) -> BackupResult<String> {
        let upload_path = match (&self.encryption, self.settings.encryption.enabled) {
            (Some((cipher, passphrase)), true) => {
                info!("Encrypting {}...", archive_path.display());
                let encrypted = cipher.encrypt(archive_path, passphrase);
                remove_local(archive_path);
                encrypted?
            }
            (None, true) => {
                remove_local(archive_path);
                return Err(BackupError::Encryption(
                    "encryption is enabled but no passphrase is available".into(),
                ));
            }
            (_, false) => archive_path.to_path_buf(),
        };

        let uploaded = self.store.upload(&upload_path);
        remove_local(&upload_path);
        uploaded
    }

    fn rotate(&self, deadline: &Deadline, report: &mut RunReport) {
        if let Err(e) = deadline.check("retention") {
            warn!("{}", e);
            report.failures.push(e.to_string());
            return;
        }

        info!("Running retention rotation...");
        match RetentionEngine::new(self.store, &self.settings.retention).rotate(deadline) {
            Ok(rotation) => {
                report.failures.extend(rotation.failure_messages());
                report.rotation = Some(rotation);
            }
            Err(e) => {
                error!("Retention failed: {}", e);
                report.failures.push(format!("retention failed: {}", e));
            }
        }
    }
}

fn remove_local(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ObjectArtifactStore;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Writes a tiny placeholder archive, failing for chosen jobs
    struct FakeArchiver {
        work_dir: PathBuf,
        failing: HashSet<String>,
        calls: RefCell<Vec<(String, ArtifactKind)>>,
    }

    impl FakeArchiver {
        fn new(work_dir: &Path) -> Self {
            Self {
                work_dir: work_dir.to_path_buf(),
                failing: HashSet::new(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Archiver for FakeArchiver {
        fn create_archive(
            &self,
            job: &BackupJob,
            state_file: &Path,
            kind: ArtifactKind,
            timestamp: ArtifactTimestamp,
        ) -> BackupResult<(PathBuf, ArtifactKind)> {
            self.calls.borrow_mut().push((job.name.clone(), kind));
            if self.failing.contains(&job.name) {
                return Err(BackupError::Archive("tar exploded".into()));
            }
            std::fs::create_dir_all(state_file.parent().unwrap()).unwrap();
            std::fs::write(state_file, b"state").unwrap();
            std::fs::create_dir_all(&self.work_dir).unwrap();
            let key = crate::models::ArtifactKey::encode(&job.name, timestamp, kind, false)?;
            let path = self.work_dir.join(key.file_name());
            std::fs::write(&path, job.name.as_bytes()).unwrap();
            Ok((path, kind))
        }

        fn extract(&self, _archive: &Path, _target_dir: &Path) -> BackupResult<()> {
            Ok(())
        }
    }

    /// Copies the file to `<path>.gpg`
    struct CopyCipher;

    impl Cipher for CopyCipher {
        fn encrypt(&self, path: &Path, _passphrase: &SecureString) -> BackupResult<PathBuf> {
            let out = crate::crypto::cipher::encrypted_path(path);
            std::fs::copy(path, &out)?;
            Ok(out)
        }

        fn decrypt(&self, path: &Path, _passphrase: &SecureString) -> BackupResult<PathBuf> {
            let out = crate::crypto::cipher::decrypted_path(path).unwrap();
            std::fs::copy(path, &out)?;
            Ok(out)
        }
    }

    struct Recording(RefCell<Vec<String>>);

    impl Notifier for Recording {
        fn send(&self, text: &str) -> BackupResult<()> {
            self.0.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    /// Store whose listing always fails
    struct Unlistable(ObjectArtifactStore);

    impl ArtifactStore for Unlistable {
        fn list(&self) -> BackupResult<ArtifactListing> {
            Err(BackupError::Storage("timeout".into()))
        }
        fn upload(&self, local_path: &Path) -> BackupResult<String> {
            self.0.upload(local_path)
        }
        fn download(&self, key: &str, local_path: &Path) -> BackupResult<()> {
            self.0.download(key, local_path)
        }
        fn delete(&self, key: &str) -> BackupResult<()> {
            self.0.delete(key)
        }
    }

    fn settings(yaml_extra: &str) -> Settings {
        let yaml = format!(
            "storage: {{ backend: local, local_dir: /unused }}\n\
             backups:\n  - {{ name: db, folders: [/a] }}\n  - {{ name: www, folders: [/b] }}\n{}",
            yaml_extra
        );
        Settings::from_yaml(&yaml).unwrap()
    }

    fn stamp(s: &str) -> ArtifactTimestamp {
        ArtifactTimestamp::parse(s).unwrap()
    }

    #[test]
    fn test_first_run_is_full_then_incremental() {
        let temp = TempDir::new().unwrap();
        let settings = settings("");
        let paths = ServicePaths::with_base_dir(temp.path().join("data"));
        let store = ObjectArtifactStore::in_memory("").unwrap();
        let archiver = FakeArchiver::new(&temp.path().join("work"));
        let runner = BackupRunner::new(&settings, &paths, &store, &archiver);

        let report = runner.run_at(false, stamp("20250301010000"), &Deadline::none());
        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(
            report.uploaded,
            vec![
                "db_20250301010000.full.tar.gz",
                "www_20250301010000.full.tar.gz"
            ]
        );

        let report = runner.run_at(false, stamp("20250302010000"), &Deadline::none());
        assert!(report.is_success());
        assert_eq!(report.uploaded[0], "db_20250302010000.incr.tar.gz");

        // Staged files are cleaned up
        assert_eq!(
            std::fs::read_dir(temp.path().join("work")).unwrap().count(),
            0
        );
    }

    #[test]
    fn test_force_full() {
        let temp = TempDir::new().unwrap();
        let settings = settings("");
        let paths = ServicePaths::with_base_dir(temp.path());
        let store = ObjectArtifactStore::in_memory("").unwrap();
        let archiver = FakeArchiver::new(&temp.path().join("work"));
        let runner = BackupRunner::new(&settings, &paths, &store, &archiver);

        runner.run_at(false, stamp("20250301010000"), &Deadline::none());
        let report = runner.run_at(true, stamp("20250302010000"), &Deadline::none());
        assert_eq!(report.uploaded[0], "db_20250302010000.full.tar.gz");
    }

    #[test]
    fn test_failing_job_does_not_stop_others() {
        let temp = TempDir::new().unwrap();
        let settings = settings("telegram: { enabled: true, bot_token: t, chat_id: c }\n");
        let paths = ServicePaths::with_base_dir(temp.path());
        let store = ObjectArtifactStore::in_memory("").unwrap();
        let mut archiver = FakeArchiver::new(&temp.path().join("work"));
        archiver.failing.insert("db".into());
        let notifier = Recording(RefCell::new(Vec::new()));
        let runner =
            BackupRunner::new(&settings, &paths, &store, &archiver).with_notifier(&notifier);

        let report = runner.run_at(false, stamp("20250301010000"), &Deadline::none());
        assert_eq!(report.uploaded, vec!["www_20250301010000.full.tar.gz"]);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("backup db failed"));
        assert!(report.rotation.is_some());

        let sent = notifier.0.borrow();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("❌ Backup Failed:"));
        assert!(sent[0].contains("tar exploded"));

        let err = report.into_result().unwrap_err();
        assert!(err.to_string().starts_with("Completed with 1 error(s)"));
    }

    #[test]
    fn test_success_notification() {
        let temp = TempDir::new().unwrap();
        let settings = settings("telegram: { enabled: true, bot_token: t, chat_id: c }\n");
        let paths = ServicePaths::with_base_dir(temp.path());
        let store = ObjectArtifactStore::in_memory("").unwrap();
        let archiver = FakeArchiver::new(&temp.path().join("work"));
        let notifier = Recording(RefCell::new(Vec::new()));
        let runner =
            BackupRunner::new(&settings, &paths, &store, &archiver).with_notifier(&notifier);

        runner.run_at(false, stamp("20250301010000"), &Deadline::none());
        assert_eq!(
            notifier.0.borrow().as_slice(),
            ["✅ Backup completed successfully"]
        );
    }

    #[test]
    fn test_encryption_uploads_gpg() {
        let temp = TempDir::new().unwrap();
        let settings = settings("encryption: { enabled: true }\n");
        let paths = ServicePaths::with_base_dir(temp.path());
        let store = ObjectArtifactStore::in_memory("").unwrap();
        let archiver = FakeArchiver::new(&temp.path().join("work"));
        let runner = BackupRunner::new(&settings, &paths, &store, &archiver)
            .with_encryption(&CopyCipher, SecureString::new("pw"));

        let report = runner.run_at(false, stamp("20250301010000"), &Deadline::none());
        assert!(report.is_success());
        assert_eq!(report.uploaded[0], "db_20250301010000.full.tar.gz.gpg");
        assert_eq!(
            std::fs::read_dir(temp.path().join("work")).unwrap().count(),
            0
        );
    }

    #[test]
    fn test_encryption_without_passphrase_fails_job_and_resets_state() {
        let temp = TempDir::new().unwrap();
        let settings = settings("encryption: { enabled: true }\n");
        let paths = ServicePaths::with_base_dir(temp.path());
        let store = ObjectArtifactStore::in_memory("").unwrap();
        let archiver = FakeArchiver::new(&temp.path().join("work"));
        let runner = BackupRunner::new(&settings, &paths, &store, &archiver);

        let report = runner.run_at(false, stamp("20250301010000"), &Deadline::none());
        assert_eq!(report.failures.len(), 2);
        assert!(report.uploaded.is_empty());
        assert!(!paths.state_file("db").unwrap().exists());
    }

    #[test]
    fn test_listing_failure_degrades_to_full() {
        let temp = TempDir::new().unwrap();
        let settings = settings("");
        let paths = ServicePaths::with_base_dir(temp.path());
        let store = Unlistable(ObjectArtifactStore::in_memory("").unwrap());
        let archiver = FakeArchiver::new(&temp.path().join("work"));
        let runner = BackupRunner::new(&settings, &paths, &store, &archiver);

        let existing = temp.path().join("db_20250301000000.full.tar.gz");
        std::fs::write(&existing, b"x").unwrap();
        store.0.upload(&existing).unwrap();

        let report = runner.run_at(false, stamp("20250302010000"), &Deadline::none());
        assert_eq!(report.uploaded[0], "db_20250302010000.full.tar.gz");
        assert_eq!(report.warnings.len(), 2);
        // Retention cannot run without a listing
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("retention failed"));
        assert!(report.rotation.is_none());
    }

    #[test]
    fn test_expired_deadline_skips_everything() {
        let temp = TempDir::new().unwrap();
        let settings = settings("");
        let paths = ServicePaths::with_base_dir(temp.path());
        let store = ObjectArtifactStore::in_memory("").unwrap();
        let archiver = FakeArchiver::new(&temp.path().join("work"));
        let runner = BackupRunner::new(&settings, &paths, &store, &archiver);

        let deadline = Deadline::after(std::time::Duration::ZERO);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let report = runner.run_at(false, stamp("20250301010000"), &deadline);
        assert!(report.uploaded.is_empty());
        assert!(archiver.calls.borrow().is_empty());
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures[0].contains("2 job(s) not started"));
    }

    #[test]
    fn test_retention_runs_after_jobs() {
        let temp = TempDir::new().unwrap();
        let settings = settings("retention: { daily: 2, monthly: 0 }\n");
        let paths = ServicePaths::with_base_dir(temp.path());
        let store = ObjectArtifactStore::in_memory("").unwrap();
        let archiver = FakeArchiver::new(&temp.path().join("work"));
        let runner = BackupRunner::new(&settings, &paths, &store, &archiver);

        runner.run_at(false, stamp("20250301010000"), &Deadline::none());
        let report = runner.run_at(false, stamp("20250302010000"), &Deadline::none());

        let rotation = report.rotation.unwrap();
        assert_eq!(rotation.kept, 2);
        assert_eq!(rotation.deleted.len(), 2);
        assert_eq!(store.list().unwrap().len(), 2);
    }
}
