use std::{env, process::ExitCode, time::Duration};

use serde::Serialize;
use ticket_admission::{
    admission::session::{Banner, CheckInSession, OperatorSurface, TicketCard},
    auth::StaticAuth,
    config::Config,
    error::SessionError,
    models::{operator::Operator, ticket::Ticket},
    scanners::{
        scanner::Scanner,
        scripted::{ScriptedDecoder, ScriptedDevice},
    },
    stores::{in_memory::InMemoryStore, store::TicketStore},
};

/// Confirms every ticket it is shown and logs what an operator would see.
struct LoggingSurface {
    banners_left: usize,
}

impl OperatorSurface for LoggingSurface {
    fn confirm(&mut self, card: &TicketCard) -> bool {
        log::info!("ticket {}", to_json(card));
        true
    }

    fn show_banner(&mut self, banner: &Banner) {
        log::info!("{} {}", banner.message(), to_json(banner));
        self.banners_left = self.banners_left.saturating_sub(1);
    }

    fn keep_scanning(&self) -> bool {
        self.banners_left > 0
    }
}

fn to_json(value: &impl Serialize) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

async fn check_in<S: TicketStore + Clone>(
    store: S,
    config: &Config,
    payloads: Vec<String>,
) -> Result<(), SessionError> {
    let auth = StaticAuth::signed_in(Operator::new(config.operator_email.clone()));
    let mut session = CheckInSession::open(store, &auth).await?;

    let mut surface = LoggingSurface {
        banners_left: payloads.iter().filter(|p| !p.trim().is_empty()).count(),
    };
    let frames = u64::try_from(payloads.len()).unwrap_or(u64::MAX);
    let scanner = Scanner::new(ScriptedDevice::new(payloads), ScriptedDecoder);
    let mut scan = scanner.start(&config.scan_target, config.scan).await?;

    let budget = Duration::from_secs(2) + Duration::from_secs(frames + 1) / config.scan.fps;
    let settled = tokio::time::timeout(budget, session.run(&mut scan, &mut surface)).await;
    match settled {
        Ok(result) => result,
        Err(_) => {
            log::warn!("scan did not settle within {budget:?}, stopping");
            scan.stop().await;
            Ok(())
        }
    }
}

fn demo_tickets() -> Vec<Ticket> {
    vec![
        Ticket::new("Ada Lovelace", "ada@example.com", "ABC123"),
        Ticket::new("Grace Hopper", "grace@example.com", "DEF456"),
        Ticket::new("Alan Turing", "alan@example.com", "GHI789"),
    ]
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut payloads: Vec<String> = env::args().skip(1).collect();
    if payloads.is_empty() {
        payloads = ["ABC123", "ZZZ999", "ABC123"].map(String::from).to_vec();
    }

    let result = match &config.database_url {
        #[cfg(feature = "postgres")]
        Some(url) => {
            match ticket_admission::stores::postgres::PostgresStore::connect(url).await {
                Ok(store) => check_in(store, &config, payloads).await,
                Err(e) => {
                    log::error!("{e}");
                    return ExitCode::FAILURE;
                }
            }
        }
        _ => match InMemoryStore::with_tickets(demo_tickets()) {
            Ok(store) => check_in(store, &config, payloads).await,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("check-in session ended: {e}");
            ExitCode::FAILURE
        }
    }
}
