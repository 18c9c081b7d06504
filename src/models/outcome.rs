use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ticket::Ticket;

/// Result of a single admission attempt. Produced fresh per attempt and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdmissionOutcome {
    Admitted {
        ticket: Ticket,
        admitted_at: DateTime<Utc>,
    },
    AlreadyUsed {
        ticket: Ticket,
    },
    NotFound {
        code: String,
    },
    LookupFailed {
        reason: String,
    },
    WriteFailed {
        reason: String,
    },
}

impl AdmissionOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }

    /// Store failures may be retried by the operator; every other outcome is final for
    /// this attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LookupFailed { .. } | Self::WriteFailed { .. })
    }
}
