use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Ticket store unavailable: {0}")]
    Unavailable(String),

    #[error("Ticket store query failed: {0}")]
    Query(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Camera unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("Invalid scan options: {0}")]
    InvalidOptions(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No ticket matches code {0:?}")]
    NotFound(String),

    #[error("Ticket lookup failed: {0}")]
    LookupFailed(String),
}

impl From<StoreError> for ResolveError {
    fn from(value: StoreError) -> Self {
        ResolveError::LookupFailed(value.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No resolved ticket is awaiting admission")]
    NothingToAdmit,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// A frame that carried no readable code.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No code in frame")]
pub struct DecodeNoise;
