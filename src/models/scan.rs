use chrono::{DateTime, Utc};

/// A decoded QR payload together with the moment it was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub code: String,
    pub captured_at: DateTime<Utc>,
}

impl ScanEvent {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            captured_at: Utc::now(),
        }
    }
}
