use chrono::NaiveDate;
use serde::Serialize;

use crate::ledger::SentLedger;
use crate::ratings::{Category, RatingStore};
use crate::report::{self, ComposeOptions, Report};
use crate::window::{self, Period, PeriodWindow};

/// A report whose period boundary holds today and which has not been sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueReport {
    pub window: PeriodWindow,
    pub report: Report,
}

/// Reports due on `now`, in weekly, monthly, yearly order.
///
/// Reads both snapshots and nothing else, so repeated calls return the same
/// candidates until the caller marks something sent.
pub fn due_reports(
    now: NaiveDate,
    categories: &[Category],
    store: &RatingStore,
    ledger: &SentLedger,
    options: ComposeOptions,
) -> Vec<DueReport> {
    Period::ALL
        .into_iter()
        .filter(|period| window::is_period_boundary(now, *period))
        .map(|period| window::window_for(now, period))
        .filter(|window| !ledger.is_sent(window.period, &window.period_id))
        .map(|window| {
            let rows = store.read_range(window.start, window.end);
            let report = report::compose(&window, categories, &rows, options);
            DueReport { window, report }
        })
        .collect()
}
