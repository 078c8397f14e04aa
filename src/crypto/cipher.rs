//! Symmetric archive encryption
//!
//! Archives are encrypted with GnuPG in symmetric mode so they can be
//! decrypted with a stock `gpg` install. The passphrase is passed on stdin,
//! never on the command line.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::SecureString;
use crate::error::{BackupError, BackupResult};
use crate::models::artifact::ENCRYPTED_SUFFIX;

/// Encrypts and decrypts local archive files
pub trait Cipher {
    /// Encrypt `path`, returning the path of the encrypted copy
    fn encrypt(&self, path: &Path, passphrase: &SecureString) -> BackupResult<PathBuf>;

    /// Decrypt `path`, returning the path of the decrypted copy
    fn decrypt(&self, path: &Path, passphrase: &SecureString) -> BackupResult<PathBuf>;
}

/// `gpg --symmetric` based cipher
#[derive(Debug, Clone)]
pub struct GpgCipher {
    program: PathBuf,
}

impl Default for GpgCipher {
    fn default() -> Self {
        Self::new("gpg")
    }
}

impl GpgCipher {
    /// Use a specific gpg binary
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args([
            "--batch",
            "--yes",
            "--quiet",
            "--pinentry-mode",
            "loopback",
            "--passphrase-fd",
            "0",
        ]);
        cmd
    }

    fn run(&self, mut cmd: Command, passphrase: &SecureString) -> BackupResult<()> {
        let input = SecureString::new(format!("{}\n", passphrase.as_str()));
        crate::command::run(&mut cmd, Some(input.as_str().as_bytes())).map_err(BackupError::Encryption)
    }
}

/// Path of the encrypted copy of `path`
pub fn encrypted_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(ENCRYPTED_SUFFIX);
    PathBuf::from(name)
}

/// Path of the decrypted copy of `path`, if it carries the encrypted suffix
pub fn decrypted_path(path: &Path) -> Option<PathBuf> {
    path.to_str()
        .and_then(|s| s.strip_suffix(ENCRYPTED_SUFFIX))
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

impl Cipher for GpgCipher {
    fn encrypt(&self, path: &Path, passphrase: &SecureString) -> BackupResult<PathBuf> {
        let output = encrypted_path(path);

        let mut cmd = self.command();
        cmd.arg("--symmetric")
            .arg("--output")
            .arg(&output)
            .arg(path);
        self.run(cmd, passphrase)?;

        Ok(output)
    }

    fn decrypt(&self, path: &Path, passphrase: &SecureString) -> BackupResult<PathBuf> {
        let output = decrypted_path(path).ok_or_else(|| {
            BackupError::Encryption(format!(
                "{} does not end in {}",
                path.display(),
                ENCRYPTED_SUFFIX
            ))
        })?;

        let mut cmd = self.command();
        cmd.arg("--decrypt")
            .arg("--output")
            .arg(&output)
            .arg(path);
        self.run(cmd, passphrase)?;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypted_path() {
        assert_eq!(
            encrypted_path(Path::new("/tmp/db_20250101000000.full.tar.gz")),
            PathBuf::from("/tmp/db_20250101000000.full.tar.gz.gpg")
        );
    }

    #[test]
    fn test_decrypted_path() {
        assert_eq!(
            decrypted_path(Path::new("/tmp/db_20250101000000.full.tar.gz.gpg")),
            Some(PathBuf::from("/tmp/db_20250101000000.full.tar.gz"))
        );
        assert_eq!(decrypted_path(Path::new("/tmp/db.tar.gz")), None);
        assert_eq!(decrypted_path(Path::new(".gpg")), None);
    }

    #[test]
    fn test_decrypt_requires_suffix() {
        let cipher = GpgCipher::default();
        let err = cipher
            .decrypt(Path::new("/tmp/plain.tar.gz"), &SecureString::new("x"))
            .unwrap_err();
        assert!(matches!(err, BackupError::Encryption(_)));
    }

    #[test]
    fn test_missing_binary_is_encryption_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let input = temp.path().join("a.tar.gz");
        std::fs::write(&input, b"data").unwrap();

        let cipher = GpgCipher::new("definitely-not-gpg");
        let err = cipher.encrypt(&input, &SecureString::new("x")).unwrap_err();
        assert!(matches!(err, BackupError::Encryption(_)));
    }
}
