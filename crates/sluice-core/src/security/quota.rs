//! Upload-session storage quota tracking.

use crate::IngestError;
use crate::Result;

/// Allocated and used bytes for one upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuotaLimit {
    /// Total bytes the session may occupy.
    pub allocated: u64,
    /// Bytes already in use before (and during) the session.
    pub used: u64,
}

impl QuotaLimit {
    /// Creates a quota with the given allocation and usage.
    #[must_use]
    pub const fn new(allocated: u64, used: u64) -> Self {
        Self { allocated, used }
    }

    /// Bytes still available. Never underflows.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.allocated.saturating_sub(self.used)
    }
}

/// Tracks quota consumption while files are accepted one at a time.
///
/// Sessions are processed sequentially, so the tracker is plain mutable
/// state owned by a single pipeline run.
#[derive(Debug, Default)]
pub struct QuotaTracker {
    limit: Option<QuotaLimit>,
    enforced: bool,
}

impl QuotaTracker {
    /// Creates a tracker. Without a limit, or with `enforced == false`, every
    /// reservation is accepted and nothing is counted.
    #[must_use]
    pub fn new(limit: Option<QuotaLimit>, enforced: bool) -> Self {
        Self { limit, enforced }
    }

    /// Creates a tracker that accepts everything.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Returns `true` if reservations can be rejected.
    #[must_use]
    pub fn is_enforced(&self) -> bool {
        self.enforced && self.limit.is_some()
    }

    /// Checks whether `size` bytes would fit, without consuming them.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::QuotaExceeded` carrying the size and the
    /// remaining quota.
    pub fn check(&self, size: u64) -> Result<()> {
        match self.limit {
            Some(limit) if self.enforced => {
                let fits = limit
                    .used
                    .checked_add(size)
                    .is_some_and(|total| total <= limit.allocated);
                if fits {
                    Ok(())
                } else {
                    Err(IngestError::QuotaExceeded {
                        size,
                        remaining: limit.remaining(),
                    })
                }
            }
            _ => Ok(()),
        }
    }

    /// Reserves `size` bytes.
    ///
    /// A rejected reservation leaves the counters untouched; an accepted one
    /// is never rolled back.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::QuotaExceeded` if the file does not fit.
    pub fn reserve(&mut self, size: u64) -> Result<()> {
        self.check(size)?;
        if self.enforced
            && let Some(limit) = self.limit.as_mut()
        {
            limit.used += size;
        }
        Ok(())
    }

    /// Current quota state, if any.
    #[must_use]
    pub fn limit(&self) -> Option<QuotaLimit> {
        self.limit
    }

    /// Bytes still available, or `None` when quotas are not enforced.
    #[must_use]
    pub fn remaining(&self) -> Option<u64> {
        self.limit
            .filter(|_| self.enforced)
            .map(|limit| limit.remaining())
    }
}
