use crate::window::Period;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Which `(period, period id)` pairs have already produced a report.
///
/// Presence of an entry is the only thing that matters; the timestamp is
/// informational and entries are never removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SentLedger {
    sent: BTreeMap<Period, BTreeMap<String, String>>,
}

impl SentLedger {
    pub fn is_sent(&self, period: Period, period_id: &str) -> bool {
        self.sent
            .get(&period)
            .is_some_and(|ids| ids.contains_key(period_id))
    }

    pub fn sent_at(&self, period: Period, period_id: &str) -> Option<&str> {
        self.sent
            .get(&period)
            .and_then(|ids| ids.get(period_id))
            .map(String::as_str)
    }

    /// Records the period as sent, refreshing the timestamp if it already was.
    pub fn mark_sent(&mut self, period: Period, period_id: &str, at: DateTime<Utc>) {
        self.sent
            .entry(period)
            .or_default()
            .insert(period_id.to_string(), stamp(at));
    }

    /// Marks the period only if it was not sent yet; returns whether it did.
    pub fn claim(&mut self, period: Period, period_id: &str, at: DateTime<Utc>) -> bool {
        let ids = self.sent.entry(period).or_default();
        if ids.contains_key(period_id) {
            return false;
        }
        ids.insert(period_id.to_string(), stamp(at));
        true
    }

    pub fn len(&self) -> usize {
        self.sent.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the persisted `{ "<period>": { "<id>": "<timestamp>" } }` shape.
    pub fn from_document(document: &Value) -> Self {
        let mut ledger = SentLedger::default();
        let Some(object) = document.as_object() else {
            if !document.is_null() {
                warn!("sent ledger is not an object; starting empty");
            }
            return ledger;
        };

        for (key, ids) in object {
            let Ok(period) = key.parse::<Period>() else {
                warn!(key = %key, "skipping unknown period in sent ledger");
                continue;
            };
            let Some(ids) = ids.as_object() else {
                warn!(period = %period, "skipping malformed sent ledger section");
                continue;
            };
            let section = ledger.sent.entry(period).or_default();
            for (id, at) in ids {
                // presence alone counts; keep whatever timestamp text was there
                let at = match at {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                section.insert(id.clone(), at);
            }
        }

        ledger
    }

    pub fn to_document(&self) -> Value {
        let object: Map<String, Value> = self
            .sent
            .iter()
            .map(|(period, ids)| {
                let ids: Map<String, Value> = ids
                    .iter()
                    .map(|(id, at)| (id.clone(), Value::String(at.clone())))
                    .collect();
                (period.as_str().to_string(), Value::Object(ids))
            })
            .collect();
        Value::Object(object)
    }
}

fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
