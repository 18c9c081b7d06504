use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::operator::OperatorId;

pub type TicketId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Unused,
    Used,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unused => "unused",
            Self::Used => "used",
        }
    }
}

/// One admission credential as held by the data store.
///
/// `qr_code` is the payload encoded in the ticket's QR image and is unique across
/// tickets. `scanned_at` and `admitted_by` are set together, exactly once, when the
/// ticket moves from `Unused` to `Used`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub name: String,
    pub email: String,
    pub qr_code: String,
    pub status: TicketStatus,
    pub scanned_at: Option<DateTime<Utc>>,
    pub admitted_by: Option<OperatorId>,
}

impl Ticket {
    pub fn new(name: impl Into<String>, email: impl Into<String>, qr_code: impl Into<String>) -> Self {
        Self {
            id: TicketId::new_v4(),
            name: name.into(),
            email: email.into(),
            qr_code: qr_code.into(),
            status: TicketStatus::Unused,
            scanned_at: None,
            admitted_by: None,
        }
    }

    pub fn is_used(&self) -> bool {
        matches!(self.status, TicketStatus::Used)
    }
}
