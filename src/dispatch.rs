use crate::scheduler::due_reports;
use crate::state::AppState;
use crate::storage::{persist_ledger, StorageError};
use crate::transport::{Delivery, OutgoingMessage};
use crate::window::Period;
use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    #[serde(rename = "type")]
    pub period: Period,
    #[serde(rename = "periodId")]
    pub period_id: String,
    pub subject: String,
    #[serde(flatten)]
    pub status: DispatchStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchStatus {
    /// Compose draft produced and the period marked sent.
    Drafted { url: String },
    /// Delivery confirmed and the period marked sent.
    Delivered,
    /// Delivery failed; the ledger is untouched so a later run retries.
    Failed { error: String },
}

/// Sends every report due on `now` and records what was sent.
///
/// The ledger lock is held from evaluation until the last mark, so two
/// concurrent triggers cannot both see a period as unsent. Marks land on a
/// copy that replaces the shared ledger only once it is on disk.
pub async fn dispatch_due(
    state: &AppState,
    now: NaiveDate,
) -> Result<Vec<DispatchResult>, StorageError> {
    let snapshot = state.ratings.lock().await.clone();
    let mut ledger = state.ledger.lock().await;
    let config = &state.config;

    let due = due_reports(now, &config.categories, &snapshot, &ledger, config.compose);
    if due.is_empty() {
        return Ok(Vec::new());
    }

    let mut next = ledger.clone();
    let mut results = Vec::with_capacity(due.len());
    let mut marked = false;

    for candidate in due {
        let window = &candidate.window;
        let message = OutgoingMessage::for_report(&candidate.report, &config.recipients);

        let status = match state.transport.send(&message).await {
            Ok(delivery) => {
                if next.claim(window.period, &window.period_id, Utc::now()) {
                    marked = true;
                }
                info!(
                    period = %window.period,
                    period_id = %window.period_id,
                    transport = state.transport.name(),
                    confirmed = state.transport.is_confirmable(),
                    "report dispatched"
                );
                match delivery {
                    Delivery::Drafted { url } => DispatchStatus::Drafted { url },
                    Delivery::Delivered => DispatchStatus::Delivered,
                }
            }
            Err(err) => {
                warn!(
                    period = %window.period,
                    period_id = %window.period_id,
                    "report delivery failed: {err}"
                );
                DispatchStatus::Failed {
                    error: err.to_string(),
                }
            }
        };

        results.push(DispatchResult {
            period: window.period,
            period_id: window.period_id.clone(),
            subject: candidate.report.subject,
            status,
        });
    }

    if marked {
        persist_ledger(&state.config.ledger_path, &next).await?;
        *ledger = next;
    }

    Ok(results)
}

/// Re-evaluates due reports for the local date on every tick.
pub fn spawn_poller(state: AppState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let today = Local::now().date_naive();
            match dispatch_due(&state, today).await {
                Ok(results) if !results.is_empty() => {
                    info!(date = %today, count = results.len(), "polling dispatch finished");
                }
                Ok(_) => {}
                Err(err) => error!(date = %today, "failed to persist sent ledger: {err}"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, TransportMode};
    use crate::ledger::SentLedger;
    use crate::ratings::{Category, RatingStore, Score};
    use crate::report::ComposeOptions;
    use crate::storage::load_ledger;
    use crate::transport::{ComposeTransport, Transport, WebhookTransport};
    use axum::{http::StatusCode, routing::post, Router};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serves `/reports`, answering 503 to the first request and 200 after.
    async fn flaky_endpoint() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/reports",
            post(move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        StatusCode::SERVICE_UNAVAILABLE
                    } else {
                        StatusCode::OK
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/reports"), hits)
    }

    fn config(dir: &Path, transport: TransportMode) -> AppConfig {
        AppConfig {
            port: 0,
            ratings_path: dir.join("ratings.json"),
            ledger_path: dir.join("sent.json"),
            categories: vec![Category::new("focus", "Focus")],
            recipients: vec!["me@example.com".into()],
            transport,
            compose: ComposeOptions::default(),
            poll_interval: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn compose_marks_optimistically_and_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut ratings = RatingStore::default();
        ratings
            .save(date(2023, 12, 30), "focus", Score::new(4).unwrap(), Utc::now())
            .unwrap();
        let state = AppState::new(
            config(dir.path(), TransportMode::Compose),
            Transport::Compose(ComposeTransport),
            ratings,
            SentLedger::default(),
        );

        let now = date(2023, 12, 31);
        let first = dispatch_due(&state, now).await.unwrap();
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|r| matches!(
            &r.status,
            DispatchStatus::Drafted { url } if url.starts_with("mailto:me@example.com")
        )));

        let second = dispatch_due(&state, now).await.unwrap();
        assert!(second.is_empty());

        let persisted = load_ledger(&state.config.ledger_path).await;
        assert!(persisted.is_sent(Period::Weekly, "2023-12-25_2023-12-31"));
        assert!(persisted.is_sent(Period::Monthly, "2023-12"));
        assert!(persisted.is_sent(Period::Yearly, "2023"));
    }

    #[tokio::test]
    async fn concurrent_triggers_dispatch_once() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(
            config(dir.path(), TransportMode::Compose),
            Transport::Compose(ComposeTransport),
            RatingStore::default(),
            SentLedger::default(),
        );

        let now = date(2024, 1, 7);
        let (a, b) = tokio::join!(dispatch_due(&state, now), dispatch_due(&state, now));
        assert_eq!(a.unwrap().len() + b.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_delivery_leaves_period_unsent() {
        let dir = tempfile::tempdir().unwrap();
        // nothing listens on the discard port
        let url = "http://127.0.0.1:9/reports";
        let state = AppState::new(
            config(dir.path(), TransportMode::Webhook { url: url.into() }),
            Transport::Webhook(WebhookTransport::new(url).unwrap()),
            RatingStore::default(),
            SentLedger::default(),
        );

        let now = date(2024, 1, 7);
        let results = dispatch_due(&state, now).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].status, DispatchStatus::Failed { .. }));
        assert!(state.ledger.lock().await.is_empty());
        assert!(!state.config.ledger_path.exists());

        let retry = dispatch_due(&state, now).await.unwrap();
        assert_eq!(retry.len(), 1);
    }

    #[tokio::test]
    async fn webhook_marks_only_after_success_status() {
        let dir = tempfile::tempdir().unwrap();
        let (url, hits) = flaky_endpoint().await;
        let state = AppState::new(
            config(dir.path(), TransportMode::Webhook { url: url.clone() }),
            Transport::Webhook(WebhookTransport::new(url).unwrap()),
            RatingStore::default(),
            SentLedger::default(),
        );
        let now = date(2024, 1, 7);
        let week = "2024-01-01_2024-01-07";

        let failed = dispatch_due(&state, now).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert!(matches!(
            &failed[0].status,
            DispatchStatus::Failed { error } if error.contains("503")
        ));
        assert!(!state.ledger.lock().await.is_sent(Period::Weekly, week));
        assert!(!state.config.ledger_path.exists());

        let delivered = dispatch_due(&state, now).await.unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].status, DispatchStatus::Delivered);
        assert!(state.ledger.lock().await.is_sent(Period::Weekly, week));
        assert!(load_ledger(&state.config.ledger_path).await.is_sent(Period::Weekly, week));

        assert!(dispatch_due(&state, now).await.unwrap().is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unwritable_ledger_keeps_period_due() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let mut settings = config(dir.path(), TransportMode::Compose);
        settings.ledger_path = blocker.join("sent.json");
        let state = AppState::new(
            settings,
            Transport::Compose(ComposeTransport),
            RatingStore::default(),
            SentLedger::default(),
        );

        let now = date(2024, 1, 7);
        assert!(dispatch_due(&state, now).await.is_err());
        assert!(state.ledger.lock().await.is_empty());

        // still due, so the next trigger tries again instead of returning nothing
        assert!(dispatch_due(&state, now).await.is_err());
        assert!(state.ledger.lock().await.is_empty());
    }
}
