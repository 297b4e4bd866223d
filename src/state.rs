use crate::config::AppConfig;
use crate::ledger::SentLedger;
use crate::ratings::RatingStore;
use crate::transport::Transport;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handles for one running instance.
///
/// Lock order is `ratings` before `ledger`; nothing holds `ratings` while
/// waiting on `ledger`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub transport: Arc<Transport>,
    pub ratings: Arc<Mutex<RatingStore>>,
    pub ledger: Arc<Mutex<SentLedger>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        transport: Transport,
        ratings: RatingStore,
        ledger: SentLedger,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            ratings: Arc::new(Mutex::new(ratings)),
            ledger: Arc::new(Mutex::new(ledger)),
        }
    }
}
