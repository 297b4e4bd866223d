use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/rate", post(handlers::rate_form))
        .route("/reports/send", post(handlers::send_form))
        .route("/api/today", get(handlers::get_today))
        .route("/api/ratings", get(handlers::get_range).post(handlers::save_rating))
        .route("/api/summary", get(handlers::get_summary))
        .route("/api/due", get(handlers::get_due))
        .route("/api/reports/dispatch", post(handlers::dispatch))
        .route("/api/ledger", get(handlers::get_ledger))
        .with_state(state)
}
