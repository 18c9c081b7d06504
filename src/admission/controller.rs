use chrono::Utc;

use crate::{
    models::{
        operator::Operator,
        outcome::AdmissionOutcome,
        ticket::{Ticket, TicketStatus},
    },
    stores::store::TicketStore,
};

use super::resolver::Resolved;

/// Moves tickets from `unused` to `used`, at most once per ticket.
///
/// The decision is made by the store's conditional write, never by the status held in
/// the resolved copy: two checkpoints may resolve the same ticket as `unused` and race
/// to admit it, and only the write that still sees `unused` wins. The loser gets
/// `AlreadyUsed` with the ticket as re-read after the race.
#[derive(Debug, Clone)]
pub struct AdmissionController<S> {
    store: S,
}

impl<S: TicketStore> AdmissionController<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn admit(&self, resolved: &Resolved, operator: &Operator) -> AdmissionOutcome {
        let ticket = resolved.ticket();
        if ticket.is_used() {
            log::info!("ticket {} was already used, not admitting", ticket.id);
            return AdmissionOutcome::AlreadyUsed {
                ticket: ticket.clone(),
            };
        }

        let admitted_at = Utc::now();
        let affected = match self
            .store
            .mark_used(&ticket.qr_code, admitted_at, operator.id)
            .await
        {
            Ok(affected) => affected,
            Err(e) => {
                log::warn!("admitting ticket {} failed: {e}", ticket.id);
                return AdmissionOutcome::WriteFailed {
                    reason: e.to_string(),
                };
            }
        };

        match affected {
            1 => {
                log::info!(
                    "admitted ticket {} for {} by {}",
                    ticket.id,
                    ticket.email,
                    operator.email
                );
                AdmissionOutcome::Admitted {
                    ticket: Ticket {
                        status: TicketStatus::Used,
                        scanned_at: Some(admitted_at),
                        admitted_by: Some(operator.id),
                        ..ticket.clone()
                    },
                    admitted_at,
                }
            }
            0 => self.report_lost_write(&ticket.qr_code).await,
            n => {
                log::warn!("admission of {:?} changed {n} tickets", ticket.qr_code);
                AdmissionOutcome::WriteFailed {
                    reason: format!("conditional update changed {n} tickets"),
                }
            }
        }
    }

    /// The conditional write changed nothing: re-read to tell a lost race apart from a
    /// ticket that disappeared.
    async fn report_lost_write(&self, qr_code: &str) -> AdmissionOutcome {
        let mut current = match self.store.find_by_code(qr_code).await {
            Ok(current) => current,
            Err(e) => {
                log::warn!("re-reading {qr_code:?} after a no-op admission failed: {e}");
                return AdmissionOutcome::LookupFailed {
                    reason: e.to_string(),
                };
            }
        };

        if current.len() != 1 {
            log::info!("ticket for {qr_code:?} vanished before admission");
            return AdmissionOutcome::NotFound {
                code: qr_code.to_string(),
            };
        }
        let ticket = current.remove(0);
        if ticket.is_used() {
            log::info!(
                "ticket {} was admitted concurrently at {:?}",
                ticket.id,
                ticket.scanned_at
            );
            AdmissionOutcome::AlreadyUsed { ticket }
        } else {
            log::warn!("ticket {} still unused after a no-op admission", ticket.id);
            AdmissionOutcome::WriteFailed {
                reason: "conditional update did not apply".to_string(),
            }
        }
    }
}
