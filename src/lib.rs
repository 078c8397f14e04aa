//! backup-service - scheduled folder backups to object storage
//!
//! This library provides the core functionality for backup-service. Each run
//! archives the configured folders with tar, encrypts them with gpg when
//! enabled and uploads them to S3-compatible storage. The first archive of a
//! job in each calendar month is full; later ones that month are incremental.
//! After every run a daily plus monthly retention policy rotates old archives.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `models`: Artifact keys, listings and restore chains
//! - `services`: Decision logic (snapshot type, chain resolution, retention)
//! - `storage`: Object store access
//! - `archive`: tar based archive creation and extraction
//! - `crypto`: gpg encryption and passphrase handling
//! - `notify`: Run notifications
//! - `backup`: Backup and restore orchestration
//! - `config`: Settings and path management
//! - `cli`, `display`: Command handlers and terminal output
//! - `error`: Custom error types
//!
//! # Artifact keys
//!
//! All metadata lives in the key itself, there is no manifest:
//!
//! ```text
//! [<prefix>/]<name>_<YYYYMMDDhhmmss>.<full|incr>.tar.gz[.gpg]
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use backup_service::models::ArtifactListing;
//! use backup_service::services::chain;
//!
//! let listing = ArtifactListing::new([
//!     "db_20250101000000.full.tar.gz",
//!     "db_20250102000000.incr.tar.gz",
//! ]);
//! let chain = chain::resolve(&listing, "db_20250102000000.incr.tar.gz")?;
//! assert_eq!(chain.len(), 2);
//! ```

pub mod archive;
pub mod backup;
pub mod cli;
mod command;
pub mod config;
pub mod crypto;
pub mod display;
pub mod error;
pub mod models;
pub mod notify;
pub mod services;
pub mod storage;

pub use error::{BackupError, BackupResult};
