use crate::{error::ResolveError, models::ticket::Ticket, stores::store::TicketStore};

const MAX_CODE_LEN: usize = 512;

/// A ticket that was looked up by the exact code it carries. Only the resolver hands
/// these out, so admission always follows a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    ticket: Ticket,
}

impl Resolved {
    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }
}

#[derive(Debug, Clone)]
pub struct TicketResolver<S> {
    store: S,
}

impl<S: TicketStore> TicketResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, code: &str) -> Result<Resolved, ResolveError> {
        let code = normalize(code).ok_or_else(|| {
            log::debug!("rejecting malformed code {code:?}");
            ResolveError::NotFound(code.to_string())
        })?;

        let mut matches = self.store.find_by_code(code).await.map_err(|e| {
            log::warn!("lookup of {code:?} failed: {e}");
            ResolveError::from(e)
        })?;

        match matches.len() {
            1 => {
                let ticket = matches.remove(0);
                log::info!(
                    "resolved {code:?} to ticket {} ({})",
                    ticket.id,
                    ticket.status.as_str()
                );
                Ok(Resolved { ticket })
            }
            0 => {
                log::info!("no ticket for {code:?}");
                Err(ResolveError::NotFound(code.to_string()))
            }
            n => {
                log::warn!("{n} tickets share code {code:?}, refusing to resolve");
                Err(ResolveError::NotFound(code.to_string()))
            }
        }
    }
}

fn normalize(code: &str) -> Option<&str> {
    let code = code.trim();
    if code.is_empty() || code.len() > MAX_CODE_LEN || code.chars().any(char::is_control) {
        None
    } else {
        Some(code)
    }
}
