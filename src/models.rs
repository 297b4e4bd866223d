use crate::aggregate::Summary;
use crate::dispatch::DispatchResult;
use crate::ratings::DayRow;
use crate::scheduler::DueReport;
use crate::window::PeriodWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub date: Option<String>,
    pub category: String,
    pub score: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub period: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DayResponse {
    pub date: NaiveDate,
    pub scores: BTreeMap<String, u8>,
    pub updated_at: Option<String>,
    pub complete: bool,
}

#[derive(Debug, Serialize)]
pub struct RangeResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: usize,
    pub rows: Vec<DayRow>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub window: PeriodWindow,
    pub averages: Summary,
    pub complete_day_averages: Summary,
}

#[derive(Debug, Serialize)]
pub struct DueResponse {
    pub date: NaiveDate,
    pub transport: &'static str,
    pub reports: Vec<DueReport>,
}

#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub date: NaiveDate,
    pub results: Vec<DispatchResult>,
}
