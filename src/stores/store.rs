use chrono::{DateTime, Utc};

use crate::{
    error::StoreError,
    models::{operator::OperatorId, ticket::Ticket},
};

/// Query interface of the backing store that owns ticket records.
///
/// `mark_used` is a compare-and-set on the ticket status: it applies only when the
/// ticket identified by `qr_code` is still `unused` at the moment of the write, and
/// reports how many rows it changed (0 or 1).
#[async_trait::async_trait]
pub trait TicketStore: Send + Sync {
    /// All tickets whose scan code equals `qr_code`. Codes are unique, so anything
    /// other than a single match means the code does not identify a ticket.
    async fn find_by_code(&self, qr_code: &str) -> Result<Vec<Ticket>, StoreError>;

    async fn mark_used(
        &self,
        qr_code: &str,
        scanned_at: DateTime<Utc>,
        admitted_by: OperatorId,
    ) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::stores::in_memory::InMemoryStore;

    use super::*;

    fn shareable<T: Send + Sync + ?Sized>(_: &T) {}

    #[tokio::test]
    async fn test_store_objects_can_be_shared_across_tasks() {
        let store: Arc<dyn TicketStore> = Arc::new(InMemoryStore::new());
        shareable(store.as_ref());

        let shared = store.clone();
        let found = tokio::spawn(async move { shared.find_by_code("ABC123").await })
            .await
            .unwrap()
            .unwrap();
        assert!(found.is_empty());
    }
}
