use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{
        operator::OperatorId,
        ticket::{Ticket, TicketStatus},
    },
};

use super::store::TicketStore;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = Pool::<Postgres>::connect(url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("migrate: {e}")))
    }

    pub async fn insert(&self, ticket: &Ticket) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO tickets (id, name, email, qr_code, status, scanned_at, admitted_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(ticket.id)
        .bind(&ticket.name)
        .bind(&ticket.email)
        .bind(&ticket.qr_code)
        .bind(SqlxTicketStatus::from(ticket.status))
        .bind(ticket.scanned_at)
        .bind(ticket.admitted_by)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| query_error(e, "insert ticket"))
    }
}

#[async_trait::async_trait]
impl TicketStore for PostgresStore {
    async fn find_by_code(&self, qr_code: &str) -> Result<Vec<Ticket>, StoreError> {
        let rows: Vec<TicketRow> = sqlx::query_as(
            "SELECT id, name, email, qr_code, status, scanned_at, admitted_by
                FROM tickets WHERE qr_code = $1 LIMIT 2",
        )
        .bind(qr_code)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_error(e, "find ticket"))?;
        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn mark_used(
        &self,
        qr_code: &str,
        scanned_at: DateTime<Utc>,
        admitted_by: OperatorId,
    ) -> Result<u64, StoreError> {
        sqlx::query(
            "UPDATE tickets SET status = $1, scanned_at = $2, admitted_by = $3
                WHERE qr_code = $4 AND status = $5",
        )
        .bind(SqlxTicketStatus::Used)
        .bind(scanned_at)
        .bind(admitted_by)
        .bind(qr_code)
        .bind(SqlxTicketStatus::Unused)
        .execute(&self.pool)
        .await
        .map(|result| result.rows_affected())
        .map_err(|e| query_error(e, "mark ticket used"))
    }
}

fn query_error(e: sqlx::Error, operation: &str) -> StoreError {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("{operation}: {e}"))
        }
        e => StoreError::Query(format!("{operation}: {e}")),
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    name: String,
    email: String,
    qr_code: String,
    status: SqlxTicketStatus,
    scanned_at: Option<DateTime<Utc>>,
    admitted_by: Option<Uuid>,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Ticket {
            id: row.id,
            name: row.name,
            email: row.email,
            qr_code: row.qr_code,
            status: row.status.into(),
            scanned_at: row.scanned_at,
            admitted_by: row.admitted_by,
        }
    }
}

#[derive(Debug, Clone, Copy, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
enum SqlxTicketStatus {
    Unused,
    Used,
}

impl From<TicketStatus> for SqlxTicketStatus {
    fn from(value: TicketStatus) -> Self {
        match value {
            TicketStatus::Unused => SqlxTicketStatus::Unused,
            TicketStatus::Used => SqlxTicketStatus::Used,
        }
    }
}

impl From<SqlxTicketStatus> for TicketStatus {
    fn from(value: SqlxTicketStatus) -> Self {
        match value {
            SqlxTicketStatus::Unused => TicketStatus::Unused,
            SqlxTicketStatus::Used => TicketStatus::Used,
        }
    }
}
