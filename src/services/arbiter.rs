//! Decides which of two files competing for one slot is kept.

use tracing::debug;

use crate::models::catalog::FileVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    KeepExisting,
    Replace,
}

#[derive(Debug, Clone)]
pub struct VersionArbiter {
    privileged_group: String,
}

impl VersionArbiter {
    pub fn new(privileged_group: impl Into<String>) -> Self {
        Self {
            privileged_group: privileged_group.into(),
        }
    }

    /// Stale entries always lose, then the privileged group wins on either
    /// side, then the newer file wins.
    #[must_use]
    pub fn arbitrate(&self, existing: Option<&FileVariant>, candidate: &FileVariant) -> Verdict {
        let Some(existing) = existing.filter(|e| e.is_present()) else {
            return Verdict::Replace;
        };

        let old_marked = existing.carries_marker(&self.privileged_group);
        let new_marked = candidate.carries_marker(&self.privileged_group);
        let verdict = if old_marked && !new_marked {
            Verdict::KeepExisting
        } else {
            Verdict::Replace
        };

        debug!(
            existing = %existing.original_filename,
            candidate = %candidate.original_filename,
            old_marked,
            new_marked,
            ?verdict,
            "Arbitrated slot"
        );
        verdict
    }

    /// The retained variant out of the two.
    #[must_use]
    pub fn pick<'a>(&self, existing: Option<&'a FileVariant>, candidate: &'a FileVariant) -> &'a FileVariant {
        match (self.arbitrate(existing, candidate), existing) {
            (Verdict::KeepExisting, Some(existing)) => existing,
            _ => candidate,
        }
    }
}
