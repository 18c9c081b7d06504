use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Utc};

use crate::{
    error::StoreError,
    models::{
        operator::OperatorId,
        ticket::{Ticket, TicketId, TicketStatus},
    },
};

use super::store::TicketStore;

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tickets: Arc<RwLock<HashMap<TicketId, Ticket>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tickets(tickets: impl IntoIterator<Item = Ticket>) -> Result<Self, StoreError> {
        let store = Self::new();
        for ticket in tickets {
            store.insert(ticket)?;
        }
        Ok(store)
    }

    /// Adds or replaces a ticket. Tickets are issued at purchase time; this is how they
    /// reach an in-process store.
    pub fn insert(&self, ticket: Ticket) -> Result<(), StoreError> {
        self.tickets
            .write()
            .map_err(|_| poisoned())?
            .insert(ticket.id, ticket);
        Ok(())
    }

    pub fn get(&self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        Ok(self
            .tickets
            .read()
            .map_err(|_| poisoned())?
            .get(&id)
            .cloned())
    }
}

#[async_trait::async_trait]
impl TicketStore for InMemoryStore {
    async fn find_by_code(&self, qr_code: &str) -> Result<Vec<Ticket>, StoreError> {
        Ok(self
            .tickets
            .read()
            .map_err(|_| poisoned())?
            .values()
            .filter(|ticket| ticket.qr_code == qr_code)
            .cloned()
            .collect())
    }

    async fn mark_used(
        &self,
        qr_code: &str,
        scanned_at: DateTime<Utc>,
        admitted_by: OperatorId,
    ) -> Result<u64, StoreError> {
        // status check and update happen under one write guard
        let mut tickets = self.tickets.write().map_err(|_| poisoned())?;
        let mut affected = 0;
        for ticket in tickets
            .values_mut()
            .filter(|t| t.qr_code == qr_code && t.status == TicketStatus::Unused)
        {
            ticket.status = TicketStatus::Used;
            ticket.scanned_at = Some(scanned_at);
            ticket.admitted_by = Some(admitted_by);
            affected += 1;
        }
        Ok(affected)
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("in-memory ticket table lock poisoned".to_string())
}
