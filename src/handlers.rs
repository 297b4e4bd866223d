use crate::aggregate::{summarize, AveragePolicy};
use crate::dispatch::dispatch_due;
use crate::errors::AppError;
use crate::models::{
    DateQuery, DayResponse, DispatchResponse, DueResponse, RangeQuery, RangeResponse,
    RatingRequest, SummaryQuery, SummaryResponse,
};
use crate::ratings::{RatingError, RatingStore, Score};
use crate::scheduler::due_reports;
use crate::state::AppState;
use crate::storage::persist_ratings;
use crate::transport::{OutgoingMessage, Transport};
use crate::ui::{render_dispatch, render_index, DueEntry};
use crate::window::{parse_date_key, window_for, Period};
use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    Form, Json,
};
use chrono::{Local, NaiveDate, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

const MAX_RANGE_DAYS: i64 = 366 * 5;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let today = today();
    let snapshot = state.ratings.lock().await.clone();
    let ledger = state.ledger.lock().await;
    let config = &state.config;
    let due = due_reports(today, &config.categories, &snapshot, &ledger, config.compose)
        .into_iter()
        .map(|candidate| {
            let draft_url = match state.transport.as_ref() {
                Transport::Compose(compose) => Some(compose.draft_url(
                    &OutgoingMessage::for_report(&candidate.report, &config.recipients),
                )),
                Transport::Webhook(_) => None,
            };
            DueEntry {
                subject: candidate.report.subject,
                draft_url,
            }
        })
        .collect::<Vec<_>>();
    Html(render_index(today, &config.categories, snapshot.get(today), &due))
}

pub async fn rate_form(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Redirect, AppError> {
    let today = today();
    let mut updates = Vec::new();
    for category in &state.config.categories {
        let Some(raw) = fields.get(&category.key).map(|v| v.trim()) else {
            continue;
        };
        if raw.is_empty() {
            continue;
        }
        let value = raw.parse::<i64>().map_err(|_| {
            AppError::bad_request(format!("score for {} must be a number", category.key))
        })?;
        updates.push((category.key.as_str(), Score::new(value)?));
    }

    let mut store = state.ratings.lock().await;
    let mut changed = false;
    for (key, score) in updates {
        changed |= store.save(today, key, score, Utc::now())?;
    }
    if changed {
        persist_ratings(&state.config.ratings_path, &store).await?;
        info!(date = %today, "ratings saved from form");
    }

    Ok(Redirect::to("/"))
}

pub async fn send_form(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let today = today();
    let results = dispatch_due(&state, today).await?;
    Ok(Html(render_dispatch(today, &results)))
}

pub async fn get_today(State(state): State<AppState>) -> Json<DayResponse> {
    let today = today();
    let store = state.ratings.lock().await;
    Json(day_response(&store, &state, today))
}

pub async fn save_rating(
    State(state): State<AppState>,
    Json(payload): Json<RatingRequest>,
) -> Result<Json<DayResponse>, AppError> {
    let date = resolve_date(payload.date.as_deref())?;
    let key = payload.category.trim();
    if state.config.category(key).is_none() {
        return Err(RatingError::UnknownCategory(key.to_string()).into());
    }
    let score = Score::new(payload.score)?;

    let mut store = state.ratings.lock().await;
    if store.save(date, key, score, Utc::now())? {
        persist_ratings(&state.config.ratings_path, &store).await?;
        info!(date = %date, category = key, score = score.get(), "rating saved");
    }

    Ok(Json(day_response(&store, &state, date)))
}

pub async fn get_range(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<RangeResponse>, AppError> {
    let start = parse_date(&query.start)?;
    let end = parse_date(&query.end)?;
    if end < start {
        return Err(AppError::bad_request("end must not be before start"));
    }
    if (end - start).num_days() >= MAX_RANGE_DAYS {
        return Err(AppError::bad_request("range is too long"));
    }

    let store = state.ratings.lock().await;
    let rows = store.read_range(start, end);
    Ok(Json(RangeResponse {
        start,
        end,
        days: rows.len(),
        rows,
    }))
}

pub async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, AppError> {
    let period = match query.period.as_deref() {
        Some(value) => value.parse::<Period>().map_err(AppError::bad_request)?,
        None => Period::Weekly,
    };
    let date = resolve_date(query.date.as_deref())?;
    let window = window_for(date, period);

    let store = state.ratings.lock().await;
    let rows = store.read_range(window.start, window.end);
    let categories = &state.config.categories;

    Ok(Json(SummaryResponse {
        averages: summarize(categories, &rows, AveragePolicy::PerCategory),
        complete_day_averages: summarize(categories, &rows, AveragePolicy::CompleteDays),
        window,
    }))
}

pub async fn get_due(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<DueResponse>, AppError> {
    let date = resolve_date(query.date.as_deref())?;
    let snapshot = state.ratings.lock().await.clone();
    let ledger = state.ledger.lock().await;
    let config = &state.config;

    Ok(Json(DueResponse {
        date,
        transport: state.transport.name(),
        reports: due_reports(date, &config.categories, &snapshot, &ledger, config.compose),
    }))
}

pub async fn dispatch(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<DispatchResponse>, AppError> {
    let date = resolve_date(query.date.as_deref())?;
    let results = dispatch_due(&state, date).await?;
    Ok(Json(DispatchResponse { date, results }))
}

pub async fn get_ledger(State(state): State<AppState>) -> Json<Value> {
    let ledger = state.ledger.lock().await;
    Json(ledger.to_document())
}

fn day_response(store: &RatingStore, state: &AppState, date: NaiveDate) -> DayResponse {
    match store.get(date) {
        Some(rating) => DayResponse {
            date,
            scores: rating.scores(),
            updated_at: rating.updated_at().map(str::to_string),
            complete: rating.is_complete(&state.config.categories),
        },
        None => DayResponse {
            date,
            scores: Default::default(),
            updated_at: None,
            complete: false,
        },
    }
}

fn resolve_date(value: Option<&str>) -> Result<NaiveDate, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => parse_date(value),
        None => Ok(today()),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    parse_date_key(value).ok_or_else(|| RatingError::InvalidDate(value.to_string()).into())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
