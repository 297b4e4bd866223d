use std::fmt::Write;

use serde::Serialize;

use crate::aggregate::{self, CategoryAverage};
use crate::ratings::{Category, DayRow};
use crate::window::{Period, PeriodWindow};

const NO_DATA: &str = "no data";
const MISSING_CELL: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    #[serde(rename = "type")]
    pub period: Period,
    #[serde(rename = "periodId")]
    pub period_id: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Append the complete-day averages and the per-day table.
    pub include_table: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            include_table: true,
        }
    }
}

pub fn compose(
    window: &PeriodWindow,
    categories: &[Category],
    rows: &[DayRow],
    options: ComposeOptions,
) -> Report {
    let subject = format!(
        "{} ratings report: {} to {}",
        window.period.label(),
        window.start,
        window.end
    );

    let recorded = rows.iter().filter(|row| row.has_any_score(categories)).count();
    let mut body = String::new();

    let _ = writeln!(
        body,
        "{} report ({}) covering {} to {}",
        window.period.label(),
        window.period_id,
        window.start,
        window.end
    );
    let _ = writeln!(body, "Days recorded: {} of {}", recorded, rows.len());
    let _ = writeln!(body);
    let _ = writeln!(body, "Averages");
    write_averages(&mut body, &aggregate::averages(categories, rows));

    if options.include_table {
        let complete = rows.iter().filter(|row| row.is_complete(categories)).count();
        let _ = writeln!(body);
        let _ = writeln!(body, "Complete-day averages ({complete} complete days)");
        write_averages(&mut body, &aggregate::strict_averages(categories, rows));

        let _ = writeln!(body);
        let _ = writeln!(body, "Daily ratings");
        write_table(&mut body, categories, rows);
    }

    Report {
        period: window.period,
        period_id: window.period_id.clone(),
        subject,
        body,
    }
}

pub fn format_average(average: Option<f64>) -> String {
    match average {
        Some(value) => format!("{value:.2}"),
        None => NO_DATA.to_string(),
    }
}

fn write_averages(out: &mut String, averages: &[CategoryAverage]) {
    for average in averages {
        let _ = writeln!(out, "- {}: {}", average.label, format_average(average.average));
    }
    let _ = writeln!(
        out,
        "Overall: {}",
        format_average(aggregate::overall(averages))
    );
}

fn write_table(out: &mut String, categories: &[Category], rows: &[DayRow]) {
    let _ = write!(out, "{:<10}", "Date");
    for category in categories {
        let _ = write!(out, " | {}", category.label);
    }
    let _ = writeln!(out);

    for row in rows {
        let _ = write!(out, "{}", row.date);
        for category in categories {
            let cell = row
                .valid_score(&category.key)
                .map(|score| score.to_string())
                .unwrap_or_else(|| MISSING_CELL.to_string());
            let width = category.label.chars().count();
            let _ = write!(out, " | {cell:<width$}");
        }
        let _ = writeln!(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::window_for;
    use chrono::NaiveDate;

    fn categories() -> Vec<Category> {
        vec![Category::new("a", "Alpha"), Category::new("b", "Beta")]
    }

    fn rows() -> Vec<DayRow> {
        let window = window_for(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(), Period::Weekly);
        let mut rows: Vec<DayRow> = (0..window.len_days())
            .map(|offset| DayRow {
                date: window.start + chrono::Duration::days(offset),
                values: Default::default(),
            })
            .collect();
        rows[0].values.insert("a".into(), 3);
        rows[1].values.insert("a".into(), 5);
        rows[1].values.insert("b".into(), 2);
        rows
    }

    #[test]
    fn body_lists_period_and_averages() {
        let window = window_for(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(), Period::Weekly);
        let report = compose(&window, &categories(), &rows(), ComposeOptions::default());

        assert_eq!(report.period, Period::Weekly);
        assert_eq!(report.period_id, "2024-01-01_2024-01-07");
        assert_eq!(
            report.subject,
            "Weekly ratings report: 2024-01-01 to 2024-01-07"
        );
        assert!(report.body.contains("Days recorded: 2 of 7"));
        assert!(report.body.contains("- Alpha: 4.00"));
        assert!(report.body.contains("- Beta: 2.00"));
        assert!(report.body.contains("Complete-day averages (1 complete days)"));
        assert!(report.body.contains("- Alpha: 5.00"));
        assert!(report.body.contains("2024-01-01 | 3     | -"));
    }

    #[test]
    fn empty_window_reports_no_data() {
        let window = window_for(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), Period::Monthly);
        let empty: Vec<DayRow> = Vec::new();
        let report = compose(
            &window,
            &categories(),
            &empty,
            ComposeOptions {
                include_table: false,
            },
        );
        assert!(report.body.contains("- Alpha: no data"));
        assert!(report.body.contains("Overall: no data"));
        assert!(!report.body.contains("Daily ratings"));
    }

    #[test]
    fn days_with_only_retired_categories_are_not_recorded() {
        let window = window_for(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(), Period::Weekly);
        let mut rows = rows();
        rows[3].values.insert("retired".into(), 4);
        let report = compose(&window, &categories(), &rows, ComposeOptions::default());
        assert!(report.body.contains("Days recorded: 2 of 7"));
    }

    #[test]
    fn output_is_reproducible() {
        let window = window_for(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), Period::Weekly);
        let first = compose(&window, &categories(), &rows(), ComposeOptions::default());
        let second = compose(&window, &categories(), &rows(), ComposeOptions::default());
        assert_eq!(first, second);
    }
}
