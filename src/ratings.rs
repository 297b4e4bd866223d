use crate::window::{date_key, parse_date_key};
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 5;

const UPDATED_AT_KEY: &str = "_updatedAt";
const LEGACY_SAVED_AT_KEY: &str = "savedAt";

/// One rated dimension. The ordered list is fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub key: String,
    pub label: String,
}

impl Category {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RatingError {
    #[error("score must be between 1 and 5, got {0}")]
    ScoreOutOfRange(i64),

    #[error("invalid category key '{0}'")]
    InvalidCategory(String),

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// A validated score in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Score(u8);

impl Score {
    pub fn new(value: i64) -> Result<Self, RatingError> {
        if is_valid_score(value) {
            Ok(Self(value as u8))
        } else {
            Err(RatingError::ScoreOutOfRange(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

pub fn is_valid_score(value: i64) -> bool {
    (MIN_SCORE..=MAX_SCORE).contains(&value)
}

/// Ratings recorded for one calendar date.
///
/// Stored values are kept exactly as loaded, so a value that fails validation
/// survives a rewrite untouched. Readers only ever see it through
/// [`DailyRating::score`], which rejects it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyRating {
    values: BTreeMap<String, Value>,
    updated_at: Option<String>,
}

impl DailyRating {
    pub fn score(&self, key: &str) -> Option<u8> {
        self.values
            .get(key)
            .and_then(Value::as_i64)
            .filter(|value| is_valid_score(*value))
            .map(|value| value as u8)
    }

    /// Every valid score, keyed by category.
    pub fn scores(&self) -> BTreeMap<String, u8> {
        self.values
            .keys()
            .filter_map(|key| self.score(key).map(|score| (key.clone(), score)))
            .collect()
    }

    pub fn is_complete(&self, categories: &[Category]) -> bool {
        categories
            .iter()
            .all(|category| self.score(&category.key).is_some())
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut rating = DailyRating::default();

        for (key, value) in object {
            if key == UPDATED_AT_KEY || key == LEGACY_SAVED_AT_KEY {
                if let Some(stamp) = value.as_str() {
                    if key == UPDATED_AT_KEY || rating.updated_at.is_none() {
                        rating.updated_at = Some(stamp.to_string());
                    }
                }
                continue;
            }
            if key.starts_with('_') {
                continue;
            }
            rating.values.insert(key.clone(), value.clone());
        }

        Some(rating)
    }

    fn to_value(&self) -> Value {
        let mut object: Map<String, Value> = self
            .values
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if let Some(stamp) = &self.updated_at {
            object.insert(UPDATED_AT_KEY.to_string(), Value::String(stamp.clone()));
        }
        Value::Object(object)
    }
}

/// One calendar date in a range read, with its numeric values.
///
/// Non-numeric stored values never reach a row; out-of-range integers do and
/// are left for the aggregator to reject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayRow {
    pub date: NaiveDate,
    pub values: BTreeMap<String, i64>,
}

impl DayRow {
    pub fn valid_score(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied().filter(|v| is_valid_score(*v))
    }

    pub fn is_complete(&self, categories: &[Category]) -> bool {
        categories
            .iter()
            .all(|category| self.valid_score(&category.key).is_some())
    }

    /// Whether any configured category holds a valid score.
    pub fn has_any_score(&self, categories: &[Category]) -> bool {
        categories
            .iter()
            .any(|category| self.valid_score(&category.key).is_some())
    }
}

/// Date-keyed ratings. Grows monotonically; nothing is pruned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingStore {
    entries: BTreeMap<NaiveDate, DailyRating>,
}

impl RatingStore {
    pub fn get(&self, date: NaiveDate) -> Option<&DailyRating> {
        self.entries.get(&date)
    }

    pub fn set(&mut self, date: NaiveDate, rating: DailyRating) {
        self.entries.insert(date, rating);
    }

    pub fn entries(&self) -> impl Iterator<Item = (&NaiveDate, &DailyRating)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Upserts one category's score for one date.
    ///
    /// Returns `false` when the stored score already equals `score`; the
    /// record, including its timestamp, is then left as it was.
    pub fn save(
        &mut self,
        date: NaiveDate,
        category: &str,
        score: Score,
        at: DateTime<Utc>,
    ) -> Result<bool, RatingError> {
        let category = category.trim();
        if category.is_empty() || category.starts_with('_') || category == LEGACY_SAVED_AT_KEY {
            return Err(RatingError::InvalidCategory(category.to_string()));
        }

        let entry = self.entries.entry(date).or_default();
        let value = i64::from(score.get());
        if entry.values.get(category).and_then(Value::as_i64) == Some(value) {
            return Ok(false);
        }

        entry.values.insert(category.to_string(), Value::from(value));
        entry.updated_at = Some(at.to_rfc3339_opts(SecondsFormat::Millis, true));
        Ok(true)
    }

    /// Every calendar date in `[start, end]`, ascending, including unrated ones.
    pub fn read_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<DayRow> {
        if end < start {
            return Vec::new();
        }

        let days = (end - start).num_days() + 1;
        let mut rows = Vec::with_capacity(days as usize);
        for offset in 0..days {
            let date = start + Duration::days(offset);
            let values = self
                .entries
                .get(&date)
                .map(|rating| {
                    rating
                        .values
                        .iter()
                        .filter_map(|(key, value)| value.as_i64().map(|v| (key.clone(), v)))
                        .collect()
                })
                .unwrap_or_default();
            rows.push(DayRow { date, values });
        }
        rows
    }

    /// Builds a store from the persisted `{ "entries": { ... } }` document.
    ///
    /// Anything that does not fit the schema is skipped, never fatal.
    pub fn from_document(document: &Value) -> Self {
        let mut store = RatingStore::default();
        let Some(entries) = document.get("entries").and_then(Value::as_object) else {
            if !document.is_null() {
                warn!("ratings document has no entries object; starting empty");
            }
            return store;
        };

        for (key, value) in entries {
            let Some(date) = parse_date_key(key) else {
                warn!(key = %key, "skipping rating with invalid date key");
                continue;
            };
            match DailyRating::from_value(value) {
                Some(rating) => {
                    store.entries.insert(date, rating);
                }
                None => warn!(date = %key, "skipping rating that is not an object"),
            }
        }

        store
    }

    pub fn to_document(&self) -> Value {
        let entries: Map<String, Value> = self
            .entries
            .iter()
            .map(|(date, rating)| (date_key(*date), rating.to_value()))
            .collect();
        serde_json::json!({ "entries": entries })
    }
}
