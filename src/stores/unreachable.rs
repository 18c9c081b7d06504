use chrono::{DateTime, Utc};

use crate::{
    error::StoreError,
    models::{operator::OperatorId, ticket::Ticket},
};

use super::store::TicketStore;

/// A store whose every call fails, standing in for a backend that cannot be reached.
#[derive(Default, Clone)]
pub struct Unreachable {}

#[async_trait::async_trait]
impl TicketStore for Unreachable {
    async fn find_by_code(&self, _qr_code: &str) -> Result<Vec<Ticket>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn mark_used(
        &self,
        _qr_code: &str,
        _scanned_at: DateTime<Utc>,
        _admitted_by: OperatorId,
    ) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}
