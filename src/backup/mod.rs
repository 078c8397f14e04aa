//! Backup and restore orchestration for backup-service
//!
//! # Architecture
//!
//! The orchestration layer wires the decision logic in [`crate::services`] to
//! the collaborators that do the actual I/O:
//!
//! - `BackupRunner`: archives each job as full or incremental, encrypts,
//!   uploads, then rotates old artifacts and notifies
//! - `RestoreManager`: resolves the chain for a restore point and applies it
//!
//! Collaborators are passed as trait objects ([`ArtifactStore`](crate::storage::ArtifactStore),
//! [`Archiver`](crate::archive::Archiver), [`Cipher`](crate::crypto::Cipher),
//! [`Notifier`](crate::notify::Notifier)) so both can run against fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use backup_service::archive::TarArchiver;
//! use backup_service::backup::BackupRunner;
//! use backup_service::config::{ServicePaths, Settings};
//! use backup_service::services::Deadline;
//! use backup_service::storage::ObjectArtifactStore;
//!
//! let settings = Settings::load("config.yaml".as_ref())?;
//! let paths = ServicePaths::new()?;
//! let store = ObjectArtifactStore::from_settings(&settings.storage)?;
//! let archiver = TarArchiver::new(settings.work_dir());
//!
//! let report = BackupRunner::new(&settings, &paths, &store, &archiver)
//!     .run(false, &Deadline::from_timeout(settings.run_timeout));
//! report.into_result()?;
//! ```

mod restore;
mod runner;

pub use restore::{RestoreManager, RestoreResult};
pub use runner::{BackupRunner, RunReport};
