use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    auth::AuthProvider,
    error::{ResolveError, SessionError},
    models::{operator::Operator, outcome::AdmissionOutcome, scan::ScanEvent, ticket::Ticket},
    scanners::scanner::ScanHandle,
    stores::store::TicketStore,
};

use super::{
    controller::AdmissionController,
    resolver::{Resolved, TicketResolver},
};

/// What the operator is shown about a resolved ticket before deciding to admit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketCard {
    pub name: String,
    pub email: String,
    pub status: String,
}

impl From<&Ticket> for TicketCard {
    fn from(ticket: &Ticket) -> Self {
        Self {
            name: ticket.name.clone(),
            email: ticket.email.clone(),
            status: ticket.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Banner {
    Success,
    AlreadyUsed { scanned_at: Option<DateTime<Utc>> },
    InvalidCode,
    Error { message: String, retryable: bool },
}

impl Banner {
    pub fn message(&self) -> String {
        match self {
            Self::Success => "Ticket successfully validated".to_string(),
            Self::AlreadyUsed {
                scanned_at: Some(at),
            } => format!("Ticket already used at {}", at.to_rfc3339()),
            Self::AlreadyUsed { scanned_at: None } => "Ticket already used".to_string(),
            Self::InvalidCode => "Invalid QR code or ticket not found".to_string(),
            Self::Error { message, .. } => message.clone(),
        }
    }
}

impl From<&AdmissionOutcome> for Banner {
    fn from(outcome: &AdmissionOutcome) -> Self {
        match outcome {
            AdmissionOutcome::Admitted { .. } => Banner::Success,
            AdmissionOutcome::AlreadyUsed { ticket } => Banner::AlreadyUsed {
                scanned_at: ticket.scanned_at,
            },
            AdmissionOutcome::NotFound { .. } => Banner::InvalidCode,
            AdmissionOutcome::LookupFailed { .. } | AdmissionOutcome::WriteFailed { .. } => {
                Banner::Error {
                    message: "Error admitting ticket".to_string(),
                    retryable: true,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDisposition {
    /// A ticket is now on display awaiting the operator's decision.
    Resolved,
    /// The code did not lead to a ticket; the banner says why.
    Rejected,
    /// A ticket is already on display, or the code was captured while one was.
    Ignored,
}

/// The display and the operator's hands.
pub trait OperatorSurface {
    /// Shows a resolved ticket and returns whether the operator chose to admit it.
    fn confirm(&mut self, card: &TicketCard) -> bool;

    fn show_banner(&mut self, banner: &Banner);

    fn keep_scanning(&self) -> bool {
        true
    }
}

/// State of one operator's check-in session: the ticket on display, if any, and the
/// last banner shown.
pub struct CheckInSession<S> {
    resolver: TicketResolver<S>,
    controller: AdmissionController<S>,
    operator: Operator,
    displayed: Option<Resolved>,
    banner: Option<Banner>,
    resumed_at: DateTime<Utc>,
}

impl<S: TicketStore + Clone> CheckInSession<S> {
    pub async fn open(store: S, auth: &impl AuthProvider) -> Result<Self, SessionError> {
        let operator = auth.current_operator().await?;
        log::info!("check-in session opened for {}", operator.email);
        Ok(Self {
            resolver: TicketResolver::new(store.clone()),
            controller: AdmissionController::new(store),
            operator,
            displayed: None,
            banner: None,
            resumed_at: DateTime::<Utc>::MIN_UTC,
        })
    }
}

impl<S: TicketStore> CheckInSession<S> {
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn displayed(&self) -> Option<TicketCard> {
        self.displayed.as_ref().map(|resolved| TicketCard::from(resolved.ticket()))
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub async fn on_scan(&mut self, event: ScanEvent) -> ScanDisposition {
        if self.displayed.is_some() || event.captured_at < self.resumed_at {
            log::trace!("ignoring {:?} while paused", event.code);
            return ScanDisposition::Ignored;
        }

        match self.resolver.resolve(&event.code).await {
            Ok(resolved) => {
                self.displayed = Some(resolved);
                self.banner = None;
                ScanDisposition::Resolved
            }
            Err(ResolveError::NotFound(_)) => {
                self.banner = Some(Banner::InvalidCode);
                ScanDisposition::Rejected
            }
            Err(ResolveError::LookupFailed(_)) => {
                self.banner = Some(Banner::Error {
                    message: "Error fetching ticket".to_string(),
                    retryable: true,
                });
                ScanDisposition::Rejected
            }
        }
    }

    /// Admits the ticket on display. A retryable failure leaves it on display so the
    /// operator can try again; any other outcome clears it and scanning resumes.
    pub async fn admit(&mut self) -> Result<AdmissionOutcome, SessionError> {
        let resolved = self.displayed.as_ref().ok_or(SessionError::NothingToAdmit)?;
        let outcome = self.controller.admit(resolved, &self.operator).await;
        self.banner = Some(Banner::from(&outcome));
        if !outcome.is_retryable() {
            self.resume();
        }
        Ok(outcome)
    }

    /// Puts the displayed ticket away without admitting it.
    pub fn dismiss(&mut self) {
        if self.displayed.is_some() {
            self.resume();
        }
    }

    fn resume(&mut self) {
        self.displayed = None;
        self.resumed_at = Utc::now();
    }

    /// Feeds scanned codes through resolution and admission until the scan ends or the
    /// surface asks to stop. The scan is stopped on every exit path; only a camera
    /// failure is returned as an error.
    pub async fn run(
        &mut self,
        scan: &mut ScanHandle,
        surface: &mut impl OperatorSurface,
    ) -> Result<(), SessionError> {
        let result = self.drive(scan, surface).await;
        scan.stop().await;
        result
    }

    async fn drive(
        &mut self,
        scan: &mut ScanHandle,
        surface: &mut impl OperatorSurface,
    ) -> Result<(), SessionError> {
        while surface.keep_scanning() {
            let Some(item) = scan.next().await else {
                break;
            };
            match self.on_scan(item?).await {
                ScanDisposition::Ignored => {}
                ScanDisposition::Rejected => {
                    if let Some(banner) = &self.banner {
                        surface.show_banner(banner);
                    }
                }
                ScanDisposition::Resolved => self.present(surface).await?,
            }
        }
        Ok(())
    }

    /// Keeps the displayed ticket in front of the operator until it is admitted, turns
    /// out to be final, or is declined. Each retryable failure asks again.
    async fn present(&mut self, surface: &mut impl OperatorSurface) -> Result<(), SessionError> {
        while surface.keep_scanning() {
            let Some(card) = self.displayed() else {
                break;
            };
            if !surface.confirm(&card) {
                self.dismiss();
                break;
            }
            self.admit().await?;
            if let Some(banner) = &self.banner {
                surface.show_banner(banner);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use crate::{
        auth::StaticAuth,
        error::StoreError,
        models::operator::OperatorId,
        models::ticket::TicketStatus,
        scanners::{
            scanner::{ScanOptions, Scanner},
            scripted::{ScriptedDecoder, ScriptedDevice},
        },
        stores::{in_memory::InMemoryStore, unreachable::Unreachable},
    };

    use super::*;

    fn auth() -> StaticAuth {
        StaticAuth::signed_in(Operator::new("gate@example.com"))
    }

    fn seeded() -> (InMemoryStore, Ticket) {
        let ticket = Ticket::new("Ada", "ada@example.com", "ABC123");
        let store = InMemoryStore::with_tickets([ticket.clone()]).unwrap();
        (store, ticket)
    }

    #[derive(Default)]
    struct Recorder {
        cards: Vec<TicketCard>,
        banners: Vec<Banner>,
        admit: bool,
        stop_after: Option<usize>,
    }

    impl OperatorSurface for Recorder {
        fn confirm(&mut self, card: &TicketCard) -> bool {
            self.cards.push(card.clone());
            self.admit
        }

        fn show_banner(&mut self, banner: &Banner) {
            self.banners.push(banner.clone());
        }

        fn keep_scanning(&self) -> bool {
            self.stop_after
                .map_or(true, |limit| self.banners.len() < limit)
        }
    }

    #[tokio::test]
    async fn test_signed_out_operator_cannot_open_session() {
        let (store, _) = seeded();
        let result = CheckInSession::open(store, &StaticAuth::signed_out()).await;
        assert!(matches!(result, Err(SessionError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_admit_then_rescan() {
        let (store, ticket) = seeded();
        let mut session = CheckInSession::open(store.clone(), &auth()).await.unwrap();

        let disposition = session.on_scan(ScanEvent::new("ABC123")).await;
        assert_eq!(ScanDisposition::Resolved, disposition);
        assert_eq!("unused", session.displayed().unwrap().status);

        let outcome = session.admit().await.unwrap();
        assert!(outcome.is_admitted());
        assert_eq!(Some(&Banner::Success), session.banner());
        assert!(session.displayed().is_none());
        assert_eq!(
            TicketStatus::Used,
            store.get(ticket.id).unwrap().unwrap().status
        );

        let disposition = session.on_scan(ScanEvent::new("ABC123")).await;
        assert_eq!(ScanDisposition::Resolved, disposition);
        assert_eq!("used", session.displayed().unwrap().status);

        let before = store.get(ticket.id).unwrap().unwrap();
        let outcome = session.admit().await.unwrap();
        assert!(matches!(outcome, AdmissionOutcome::AlreadyUsed { .. }));
        assert!(matches!(
            session.banner(),
            Some(Banner::AlreadyUsed {
                scanned_at: Some(_)
            })
        ));
        assert_eq!(before, store.get(ticket.id).unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_unknown_code_shows_invalid_and_admits_nothing() {
        let (store, _) = seeded();
        let mut session = CheckInSession::open(store, &auth()).await.unwrap();

        let disposition = session.on_scan(ScanEvent::new("ZZZ999")).await;
        assert_eq!(ScanDisposition::Rejected, disposition);
        assert_eq!(Some(&Banner::InvalidCode), session.banner());
        assert_eq!(
            "Invalid QR code or ticket not found",
            Banner::InvalidCode.message()
        );
        assert_eq!(Err(SessionError::NothingToAdmit), session.admit().await);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_retryable_error() {
        let mut session = CheckInSession::open(Unreachable::default(), &auth())
            .await
            .unwrap();
        let disposition = session.on_scan(ScanEvent::new("ABC123")).await;
        assert_eq!(ScanDisposition::Rejected, disposition);
        assert!(matches!(
            session.banner(),
            Some(Banner::Error {
                retryable: true,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_scans_are_ignored_while_ticket_displayed() {
        let (store, _) = seeded();
        let other = Ticket::new("Bob", "bob@example.com", "XYZ789");
        store.insert(other).unwrap();
        let mut session = CheckInSession::open(store, &auth()).await.unwrap();

        assert_eq!(
            ScanDisposition::Resolved,
            session.on_scan(ScanEvent::new("ABC123")).await
        );
        let captured_while_paused = ScanEvent {
            code: "XYZ789".to_string(),
            captured_at: Utc::now() - chrono::Duration::seconds(1),
        };
        assert_eq!(
            ScanDisposition::Ignored,
            session.on_scan(captured_while_paused.clone()).await
        );
        assert_eq!("Ada", session.displayed().unwrap().name);

        session.dismiss();
        assert!(session.displayed().is_none());
        assert_eq!(
            ScanDisposition::Ignored,
            session.on_scan(captured_while_paused).await
        );
        assert_eq!(
            ScanDisposition::Resolved,
            session.on_scan(ScanEvent::new("XYZ789")).await
        );
    }

    #[tokio::test]
    async fn test_run_scans_resolves_and_admits() {
        let (store, ticket) = seeded();
        let device = ScriptedDevice::new(["", "ZZZ999", "", "ABC123"]);
        let scanner = Scanner::new(device.clone(), ScriptedDecoder);
        let options = ScanOptions {
            fps: 60,
            ..Default::default()
        };
        let mut scan = scanner.start("reader", options).await.unwrap();
        let mut session = CheckInSession::open(store.clone(), &auth()).await.unwrap();
        let mut surface = Recorder {
            admit: true,
            stop_after: Some(2),
            ..Default::default()
        };

        session.run(&mut scan, &mut surface).await.unwrap();

        assert_eq!(vec![Banner::InvalidCode, Banner::Success], surface.banners);
        assert_eq!(1, surface.cards.len());
        assert_eq!("Ada", surface.cards[0].name);
        assert!(!device.is_acquired());
        let stored = store.get(ticket.id).unwrap().unwrap();
        assert_eq!(TicketStatus::Used, stored.status);
        assert_eq!(Some(session.operator().id), stored.admitted_by);
    }

    #[tokio::test]
    async fn test_run_declined_ticket_is_left_unused() {
        let (store, ticket) = seeded();
        let device = ScriptedDevice::new(["ABC123"]).failing_after(3);
        let scanner = Scanner::new(device.clone(), ScriptedDecoder);
        let options = ScanOptions {
            fps: 60,
            ..Default::default()
        };
        let mut scan = scanner.start("reader", options).await.unwrap();
        let mut session = CheckInSession::open(store.clone(), &auth()).await.unwrap();
        let mut surface = Recorder::default();

        let result = session.run(&mut scan, &mut surface).await;

        assert!(matches!(result, Err(SessionError::Scan(_))));
        assert_eq!(1, surface.cards.len());
        assert!(surface.banners.is_empty());
        assert!(!device.is_acquired());
        assert_eq!(
            TicketStatus::Unused,
            store.get(ticket.id).unwrap().unwrap().status
        );
    }

    /// Resolves from the wrapped store but fails the first conditional write.
    #[derive(Clone)]
    struct FirstWriteFails {
        inner: InMemoryStore,
        failed: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl TicketStore for FirstWriteFails {
        async fn find_by_code(&self, qr_code: &str) -> Result<Vec<Ticket>, StoreError> {
            self.inner.find_by_code(qr_code).await
        }

        async fn mark_used(
            &self,
            qr_code: &str,
            scanned_at: DateTime<Utc>,
            admitted_by: OperatorId,
        ) -> Result<u64, StoreError> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
            self.inner.mark_used(qr_code, scanned_at, admitted_by).await
        }
    }

    #[tokio::test]
    async fn test_run_retries_admission_after_store_failure() {
        let (inner, ticket) = seeded();
        inner
            .insert(Ticket::new("Bob", "bob@example.com", "XYZ789"))
            .unwrap();
        let store = FirstWriteFails {
            inner: inner.clone(),
            failed: Arc::new(AtomicBool::new(false)),
        };
        let device = ScriptedDevice::new(["ABC123", "", "XYZ789", "", "ZZZ999"]);
        let scanner = Scanner::new(device.clone(), ScriptedDecoder);
        let options = ScanOptions {
            fps: 60,
            ..Default::default()
        };
        let mut scan = scanner.start("reader", options).await.unwrap();
        let mut session = CheckInSession::open(store, &auth()).await.unwrap();
        let mut surface = Recorder {
            admit: true,
            stop_after: Some(4),
            ..Default::default()
        };

        session.run(&mut scan, &mut surface).await.unwrap();

        assert_eq!(
            vec![
                Banner::Error {
                    message: "Error admitting ticket".to_string(),
                    retryable: true,
                },
                Banner::Success,
                Banner::Success,
                Banner::InvalidCode,
            ],
            surface.banners
        );
        let names: Vec<_> = surface.cards.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(vec!["Ada", "Ada", "Bob"], names);
        assert!(session.displayed().is_none());
        assert_eq!(
            TicketStatus::Used,
            inner.get(ticket.id).unwrap().unwrap().status
        );
        assert!(!device.is_acquired());
    }

    #[tokio::test]
    async fn test_admit_keeps_ticket_displayed_after_store_failure() {
        let (inner, ticket) = seeded();
        let store = FirstWriteFails {
            inner: inner.clone(),
            failed: Arc::new(AtomicBool::new(false)),
        };
        let mut session = CheckInSession::open(store, &auth()).await.unwrap();
        session.on_scan(ScanEvent::new("ABC123")).await;

        let outcome = session.admit().await.unwrap();
        assert!(matches!(outcome, AdmissionOutcome::WriteFailed { .. }));
        assert_eq!("Ada", session.displayed().unwrap().name);

        let outcome = session.admit().await.unwrap();
        assert!(outcome.is_admitted());
        assert!(session.displayed().is_none());
        assert_eq!(
            TicketStatus::Used,
            inner.get(ticket.id).unwrap().unwrap().status
        );
    }
}
