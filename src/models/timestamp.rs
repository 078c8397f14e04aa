//! Artifact timestamps and month buckets
//!
//! On the wire a timestamp is the fixed-width `YYYYMMDDhhmmss` form, which
//! sorts lexicographically in chronological order. Internally it is a real
//! date-time so ordering never depends on the string layout.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BackupError;

/// Wire format of artifact timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Number of characters in an encoded timestamp
pub const TIMESTAMP_LEN: usize = 14;

/// Point in time an artifact was produced (second precision)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactTimestamp(NaiveDateTime);

impl ArtifactTimestamp {
    /// Wrap a date-time, dropping sub-second precision
    pub fn new(datetime: NaiveDateTime) -> Self {
        let truncated = datetime.with_nanosecond(0).unwrap_or(datetime);
        Self(truncated)
    }

    /// Current local time
    pub fn now() -> Self {
        Self::new(chrono::Local::now().naive_local())
    }

    /// Parse the 14-digit wire form
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != TIMESTAMP_LEN || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
            .ok()
            .map(Self)
    }

    /// The underlying date-time
    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    /// Year+month bucket this timestamp falls in
    pub fn month_bucket(&self) -> MonthBucket {
        MonthBucket {
            year: self.0.year(),
            month: self.0.month(),
        }
    }
}

impl fmt::Display for ArtifactTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl FromStr for ArtifactTimestamp {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            BackupError::NotAnArtifact(format!("invalid timestamp '{}'", s))
        })
    }
}

impl From<NaiveDateTime> for ArtifactTimestamp {
    fn from(datetime: NaiveDateTime) -> Self {
        Self::new(datetime)
    }
}

/// Calendar month used to group artifacts (e.g., "2025-01")
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
}

impl MonthBucket {
    /// Create a month bucket
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }
}

impl fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
