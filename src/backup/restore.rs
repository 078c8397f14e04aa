//! Backup restoration for backup-service
//!
//! A restore downloads every archive of the chain ending at the requested
//! artifact and extracts them in order into the target directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use crate::archive::Archiver;
use crate::crypto::{Cipher, SecureString};
use crate::error::{BackupError, BackupResult};
use crate::models::{ArtifactKey, ArtifactListing, BackupChain};
use crate::services::{chain, Deadline};
use crate::storage::ArtifactStore;

/// Handles restoring from backups
pub struct RestoreManager<'a> {
    store: &'a dyn ArtifactStore,
    archiver: &'a dyn Archiver,
    decryption: Option<(&'a dyn Cipher, SecureString)>,
    work_dir: PathBuf,
}

impl<'a> RestoreManager<'a> {
    /// Create a RestoreManager staging downloads under `work_dir`
    pub fn new(
        store: &'a dyn ArtifactStore,
        archiver: &'a dyn Archiver,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            archiver,
            decryption: None,
            work_dir: work_dir.into(),
        }
    }

    /// Decrypt `.gpg` archives with `cipher`
    pub fn with_decryption(mut self, cipher: &'a dyn Cipher, passphrase: SecureString) -> Self {
        self.decryption = Some((cipher, passphrase));
        self
    }

    /// List storage and resolve the chain ending at `key`
    ///
    /// A key given without the storage prefix is matched by file name.
    pub fn resolve(&self, key: &str) -> BackupResult<BackupChain> {
        let listing = self
            .store
            .list()
            .map_err(|e| BackupError::ListingUnavailable(e.to_string()))?;
        let key = canonical_key(&listing, key);
        chain::resolve(&listing, &key)
    }

    /// Restore the artifact `key` into `target_dir`
    ///
    /// Stops at the first download, decrypt or extract failure; later
    /// archives of the chain are meaningless without it.
    pub fn restore(
        &self,
        key: &str,
        target_dir: &Path,
        deadline: &Deadline,
    ) -> BackupResult<RestoreResult> {
        let chain = self.resolve(key)?;
        info!(
            "Restoring {} from {} archive(s)",
            chain.target(),
            chain.len()
        );

        fs::create_dir_all(target_dir).map_err(|e| {
            BackupError::Io(format!("Failed to create target directory: {}", e))
        })?;

        let staging = self.work_dir.join(format!("restore-{}", Uuid::new_v4()));
        fs::create_dir_all(&staging).map_err(|e| {
            BackupError::Io(format!("Failed to create staging directory: {}", e))
        })?;

        let result = self.apply_chain(&chain, &staging, target_dir, deadline);

        if let Err(e) = fs::remove_dir_all(&staging) {
            warn!("Failed to remove {}: {}", staging.display(), e);
        }

        result.map(|restored| RestoreResult {
            chain,
            restored,
            target_dir: target_dir.to_path_buf(),
        })
    }

    fn apply_chain(
        &self,
        chain: &BackupChain,
        staging: &Path,
        target_dir: &Path,
        deadline: &Deadline,
    ) -> BackupResult<usize> {
        let mut restored = 0;
        for artifact in chain {
            deadline.check(format!("download {}", artifact))?;
            self.apply_one(artifact, staging, target_dir)?;
            restored += 1;
        }
        Ok(restored)
    }

    fn apply_one(&self, artifact: &ArtifactKey, staging: &Path, target_dir: &Path) -> BackupResult<()> {
        let key = artifact.key();
        let downloaded = staging.join(artifact.file_name());

        info!("Downloading {}...", key);
        self.store.download(&key, &downloaded)?;

        let archive = if artifact.is_encrypted() {
            let (cipher, passphrase) = self.decryption.as_ref().ok_or_else(|| {
                BackupError::Encryption(format!(
                    "{} is encrypted but encryption is not enabled",
                    key
                ))
            })?;
            info!("Decrypting {}...", key);
            let decrypted = cipher.decrypt(&downloaded, passphrase)?;
            let _ = fs::remove_file(&downloaded);
            decrypted
        } else {
            downloaded
        };

        info!("Extracting {} to {}...", key, target_dir.display());
        self.archiver.extract(&archive, target_dir)?;
        let _ = fs::remove_file(&archive);
        Ok(())
    }
}

/// Map a bare file name onto the prefixed key it is stored under
fn canonical_key(listing: &ArtifactListing, key: &str) -> String {
    if key.contains('/') {
        return key.to_string();
    }
    listing
        .keys()
        .iter()
        .find(|listed| listed.rsplit('/').next() == Some(key))
        .cloned()
        .unwrap_or_else(|| key.to_string())
}

/// Result of a restore operation
#[derive(Debug)]
pub struct RestoreResult {
    /// The chain that was applied
    pub chain: BackupChain,
    /// Number of archives extracted
    pub restored: usize,
    /// Where the archives were extracted
    pub target_dir: PathBuf,
}

impl RestoreResult {
    /// Get a summary of what was restored
    pub fn summary(&self) -> String {
        format!(
            "Restored {} ({} archive(s)) into {}",
            self.chain.target(),
            self.restored,
            self.target_dir.display()
        )
    }
}
