//! Artifact key naming codec
//!
//! Every stored archive is identified by its key alone:
//!
//! ```text
//! [<prefix>/]<name>_<YYYYMMDDhhmmss>.<full|incr>.tar.gz[.gpg]
//! ```
//!
//! There is no manifest; the job name, timestamp, snapshot kind and encryption
//! flag are all recovered from the key. Keys that do not follow this layout are
//! not backup artifacts and are skipped by every consumer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::timestamp::ArtifactTimestamp;
use crate::error::{BackupError, BackupResult};

/// Archive extension shared by all artifacts
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Suffix appended to encrypted artifacts
pub const ENCRYPTED_SUFFIX: &str = ".gpg";

const NAME_SEPARATOR: char = '_';

/// Whether an archive is self-contained or depends on an earlier full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Self-contained snapshot of every target path
    Full,
    /// Changes since the previous archive of the same month's chain
    Incremental,
}

impl ArtifactKind {
    /// Marker used in the key between the timestamp and the archive suffix
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incr",
        }
    }

    /// Parse a kind marker
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "full" => Some(Self::Full),
            "incr" => Some(Self::Incremental),
            _ => None,
        }
    }

    /// Check if this is a full snapshot
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "Full"),
            Self::Incremental => write!(f, "Incremental"),
        }
    }
}

/// Validate a logical backup name
///
/// Names end up inside keys, so they must not contain the path, name or
/// extension separators.
pub fn validate_name(name: &str) -> BackupResult<()> {
    if name.is_empty() || name.contains(['/', NAME_SEPARATOR, '.']) {
        return Err(BackupError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// A decoded artifact key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    /// Storage prefix the key lives under ("" when stored at the root)
    prefix: String,
    /// Logical backup job name
    name: String,
    /// When the archive was produced
    timestamp: ArtifactTimestamp,
    /// Full or incremental
    kind: ArtifactKind,
    /// Whether the archive was encrypted before upload
    encrypted: bool,
}

impl ArtifactKey {
    /// Build a key for a new artifact
    pub fn encode(
        name: impl Into<String>,
        timestamp: ArtifactTimestamp,
        kind: ArtifactKind,
        encrypted: bool,
    ) -> BackupResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            prefix: String::new(),
            name,
            timestamp,
            kind,
            encrypted,
        })
    }

    /// Decode a stored key
    ///
    /// Returns `NotAnArtifact` for anything that does not follow the naming
    /// scheme. Callers listing storage should skip such keys.
    pub fn decode(key: &str) -> BackupResult<Self> {
        let not_an_artifact = || BackupError::NotAnArtifact(key.to_string());

        let (prefix, file_name) = match key.rsplit_once('/') {
            Some((prefix, file_name)) => (prefix, file_name),
            None => ("", key),
        };

        let (rest, encrypted) = match file_name.strip_suffix(ENCRYPTED_SUFFIX) {
            Some(rest) => (rest, true),
            None => (file_name, false),
        };

        let rest = rest.strip_suffix(ARCHIVE_SUFFIX).ok_or_else(not_an_artifact)?;
        let (stem, marker) = rest.rsplit_once('.').ok_or_else(not_an_artifact)?;
        let kind = ArtifactKind::from_marker(marker).ok_or_else(not_an_artifact)?;

        let (name, stamp) = stem.rsplit_once(NAME_SEPARATOR).ok_or_else(not_an_artifact)?;
        let timestamp = ArtifactTimestamp::parse(stamp).ok_or_else(not_an_artifact)?;
        validate_name(name).map_err(|_| not_an_artifact())?;

        Ok(Self {
            prefix: prefix.to_string(),
            name: name.to_string(),
            timestamp,
            kind,
            encrypted,
        })
    }

    /// Place this key under a storage prefix
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.trim_matches('/').to_string();
        self
    }

    /// Logical backup job name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When the archive was produced
    pub fn timestamp(&self) -> ArtifactTimestamp {
        self.timestamp
    }

    /// Snapshot kind
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Whether the archive is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Storage prefix ("" at the root)
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key without the storage prefix
    pub fn file_name(&self) -> String {
        format!(
            "{}{}{}.{}{}{}",
            self.name,
            NAME_SEPARATOR,
            self.timestamp,
            self.kind.marker(),
            ARCHIVE_SUFFIX,
            if self.encrypted { ENCRYPTED_SUFFIX } else { "" }
        )
    }

    /// Full storage key
    pub fn key(&self) -> String {
        if self.prefix.is_empty() {
            self.file_name()
        } else {
            format!("{}/{}", self.prefix, self.file_name())
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for ArtifactKey {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
