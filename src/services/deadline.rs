//! Run deadline
//!
//! A deadline only gates the start of the next step (job, deletion, download).
//! External tools that are already running are left to finish.

use std::time::{Duration, Instant};

use crate::error::{BackupError, BackupResult};

/// Optional point in time after which no new step is started
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires
    pub fn none() -> Self {
        Self { at: None }
    }

    /// Expire `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
        }
    }

    /// Build from an optional configured timeout
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map(Self::after).unwrap_or_default()
    }

    /// Check if the deadline has passed
    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Fail with `DeadlineExceeded` if the deadline has passed
    pub fn check(&self, next_step: impl Into<String>) -> BackupResult<()> {
        if self.is_expired() {
            Err(BackupError::DeadlineExceeded(next_step.into()))
        } else {
            Ok(())
        }
    }
}
