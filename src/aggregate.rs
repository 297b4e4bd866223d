use crate::ratings::{Category, DayRow};
use serde::Serialize;

/// Mean score for one category over a window; `None` means no data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAverage {
    pub key: String,
    pub label: String,
    pub average: Option<f64>,
    pub samples: usize,
}

/// Which days contribute to a category's average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AveragePolicy {
    /// Each category averages over the days where it has a valid score.
    PerCategory,
    /// Only days with every category scored count, for every category.
    CompleteDays,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub policy: AveragePolicy,
    pub categories: Vec<CategoryAverage>,
    pub overall: Option<f64>,
    pub days_in_window: usize,
    pub days_recorded: usize,
    pub complete_days: usize,
}

pub fn averages(categories: &[Category], rows: &[DayRow]) -> Vec<CategoryAverage> {
    categories
        .iter()
        .map(|category| {
            let scores = rows.iter().filter_map(|row| row.valid_score(&category.key));
            average_of(category, scores)
        })
        .collect()
}

pub fn strict_averages(categories: &[Category], rows: &[DayRow]) -> Vec<CategoryAverage> {
    let complete: Vec<&DayRow> = rows
        .iter()
        .filter(|row| row.is_complete(categories))
        .collect();

    categories
        .iter()
        .map(|category| {
            let scores = complete
                .iter()
                .filter_map(|row| row.valid_score(&category.key));
            average_of(category, scores)
        })
        .collect()
}

/// Mean of the category averages that have data.
pub fn overall(per_category: &[CategoryAverage]) -> Option<f64> {
    let present: Vec<f64> = per_category.iter().filter_map(|c| c.average).collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

pub fn summarize(categories: &[Category], rows: &[DayRow], policy: AveragePolicy) -> Summary {
    let per_category = match policy {
        AveragePolicy::PerCategory => averages(categories, rows),
        AveragePolicy::CompleteDays => strict_averages(categories, rows),
    };

    Summary {
        policy,
        overall: overall(&per_category),
        categories: per_category,
        days_in_window: rows.len(),
        days_recorded: rows.iter().filter(|row| row.has_any_score(categories)).count(),
        complete_days: rows.iter().filter(|row| row.is_complete(categories)).count(),
    }
}

fn average_of(category: &Category, scores: impl Iterator<Item = i64>) -> CategoryAverage {
    let (sum, samples) = scores.fold((0i64, 0usize), |(sum, n), score| (sum + score, n + 1));
    CategoryAverage {
        key: category.key.clone(),
        label: category.label.clone(),
        average: if samples == 0 {
            None
        } else {
            Some(sum as f64 / samples as f64)
        },
        samples,
    }
}
