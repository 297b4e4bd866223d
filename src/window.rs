use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A recurring calendar-aligned reporting cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    /// Evaluation order used by the scheduler.
    pub const ALL: [Period; 3] = [Period::Weekly, Period::Monthly, Period::Yearly];

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Yearly => "yearly",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Period::Weekly => "Weekly",
            Period::Monthly => "Monthly",
            Period::Yearly => "Yearly",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Ok(Period::Weekly),
            "monthly" | "month" => Ok(Period::Monthly),
            "yearly" | "year" => Ok(Period::Yearly),
            other => Err(format!("unknown period '{other}'")),
        }
    }
}

/// Closed date interval covering one concrete instance of a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodWindow {
    #[serde(rename = "type")]
    pub period: Period,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(rename = "periodId")]
    pub period_id: String,
}

impl PeriodWindow {
    fn new(period: Period, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            period,
            start,
            end,
            period_id: period_id(period, start, end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days in the window, both endpoints included.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses the strict `YYYY-MM-DD` form; signed or expanded years are rejected.
pub fn parse_date_key(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Days in the given month, taken as the day before the first of the next month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

pub fn is_period_boundary(now: NaiveDate, period: Period) -> bool {
    match period {
        Period::Weekly => now.weekday() == Weekday::Sun,
        Period::Monthly => now.day() == days_in_month(now.year(), now.month()),
        Period::Yearly => now.month() == 12 && now.day() == 31,
    }
}

pub fn window_for(now: NaiveDate, period: Period) -> PeriodWindow {
    match period {
        Period::Weekly => {
            let start = week_start(now);
            PeriodWindow::new(period, start, start + Duration::days(6))
        }
        Period::Monthly => {
            let start = now.with_day(1).unwrap_or(now);
            let end = now
                .with_day(days_in_month(now.year(), now.month()))
                .unwrap_or(now);
            PeriodWindow::new(period, start, end)
        }
        Period::Yearly => {
            let start = NaiveDate::from_ymd_opt(now.year(), 1, 1).unwrap_or(now);
            let end = NaiveDate::from_ymd_opt(now.year(), 12, 31).unwrap_or(now);
            PeriodWindow::new(period, start, end)
        }
    }
}

/// Canonical, sortable identifier: `start_end` for weeks, `YYYY-MM` for months, `YYYY` for years.
pub fn period_id(period: Period, start: NaiveDate, end: NaiveDate) -> String {
    match period {
        Period::Weekly => format!("{}_{}", date_key(start), date_key(end)),
        Period::Monthly => start.format("%Y-%m").to_string(),
        Period::Yearly => format!("{:04}", start.year()),
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    // (sunday-based weekday + 6) mod 7 == days since Monday
    let offset = (date.weekday().num_days_from_sunday() + 6) % 7;
    date - Duration::days(i64::from(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekly_window_contains_date_and_starts_monday() {
        let mut day = date(2023, 12, 1);
        while day <= date(2025, 3, 31) {
            let window = window_for(day, Period::Weekly);
            assert!(window.contains(day), "{day} not in {window:?}");
            assert_eq!(window.start.weekday(), Weekday::Mon);
            assert_eq!(window.end.weekday(), Weekday::Sun);
            assert_eq!(window.len_days(), 7);
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn weekly_window_spans_year_boundary() {
        let window = window_for(date(2025, 12, 31), Period::Weekly);
        assert_eq!(window.start, date(2025, 12, 29));
        assert_eq!(window.end, date(2026, 1, 4));
        assert_eq!(window.period_id, "2025-12-29_2026-01-04");
    }

    #[test]
    fn sunday_belongs_to_preceding_monday() {
        let window = window_for(date(2024, 1, 7), Period::Weekly);
        assert_eq!(window.start, date(2024, 1, 1));
        assert_eq!(window.end, date(2024, 1, 7));
    }

    #[test]
    fn month_end_boundaries() {
        assert!(is_period_boundary(date(2024, 2, 29), Period::Monthly));
        assert!(!is_period_boundary(date(2024, 2, 28), Period::Monthly));
        assert!(is_period_boundary(date(2023, 2, 28), Period::Monthly));
        assert!(is_period_boundary(date(2024, 4, 30), Period::Monthly));
        assert!(!is_period_boundary(date(2024, 5, 30), Period::Monthly));
        assert!(is_period_boundary(date(2024, 5, 31), Period::Monthly));
        assert!(is_period_boundary(date(1900, 2, 28), Period::Monthly));
        assert!(is_period_boundary(date(2000, 2, 29), Period::Monthly));
    }

    #[test]
    fn monthly_boundary_matches_days_in_month() {
        let mut day = date(2023, 1, 1);
        while day <= date(2024, 12, 31) {
            let expected = day.day() == days_in_month(day.year(), day.month());
            assert_eq!(is_period_boundary(day, Period::Monthly), expected, "{day}");
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn weekly_and_yearly_boundaries() {
        assert!(is_period_boundary(date(2024, 1, 7), Period::Weekly));
        assert!(!is_period_boundary(date(2024, 1, 8), Period::Weekly));
        assert!(is_period_boundary(date(2024, 12, 31), Period::Yearly));
        assert!(!is_period_boundary(date(2024, 12, 30), Period::Yearly));
    }

    #[test]
    fn monthly_and_yearly_windows() {
        let month = window_for(date(2024, 2, 10), Period::Monthly);
        assert_eq!(month.start, date(2024, 2, 1));
        assert_eq!(month.end, date(2024, 2, 29));
        assert_eq!(month.period_id, "2024-02");

        let year = window_for(date(2024, 6, 15), Period::Yearly);
        assert_eq!(year.start, date(2024, 1, 1));
        assert_eq!(year.end, date(2024, 12, 31));
        assert_eq!(year.period_id, "2024");
        assert_eq!(year.len_days(), 366);
    }

    #[test]
    fn period_ids_are_stable_and_distinct() {
        let a = window_for(date(2024, 3, 4), Period::Weekly);
        let b = window_for(date(2024, 3, 10), Period::Weekly);
        let c = window_for(date(2024, 3, 11), Period::Weekly);
        assert_eq!(a.period_id, b.period_id);
        assert_ne!(a.period_id, c.period_id);
        assert!(a.period_id < c.period_id);
    }

    #[test]
    fn date_keys_are_four_digit_years_only() {
        assert_eq!(parse_date_key(" 2024-02-29 "), Some(date(2024, 2, 29)));
        assert_eq!(parse_date_key("2023-02-29"), None);
        assert_eq!(parse_date_key("+262142-12-31"), None);
        assert_eq!(parse_date_key("-0001-01-01"), None);
        assert_eq!(parse_date_key("2024-1-5"), None);
        assert_eq!(parse_date_key("12024-01-05"), None);
    }

    #[test]
    fn windows_at_the_last_parseable_date() {
        let last = parse_date_key("9999-12-31").unwrap();
        for period in Period::ALL {
            let window = window_for(last, period);
            assert!(window.contains(last));
        }
        assert_eq!(window_for(last, Period::Weekly).end, date(10000, 1, 2));
    }

    #[test]
    fn period_parses_loosely() {
        assert_eq!(" Weekly ".parse::<Period>(), Ok(Period::Weekly));
        assert_eq!("month".parse::<Period>(), Ok(Period::Monthly));
        assert!("daily".parse::<Period>().is_err());
    }
}
