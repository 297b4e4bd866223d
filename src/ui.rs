use crate::dispatch::{DispatchResult, DispatchStatus};
use crate::ratings::{Category, DailyRating, MAX_SCORE, MIN_SCORE};
use chrono::NaiveDate;
use std::fmt::Write;

/// A due report as listed on the index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueEntry {
    pub subject: String,
    /// Compose link, present only when drafts are the delivery mode.
    pub draft_url: Option<String>,
}

pub fn render_index(
    date: NaiveDate,
    categories: &[Category],
    rating: Option<&DailyRating>,
    due: &[DueEntry],
) -> String {
    let mut fields = String::new();
    for category in categories {
        let current = rating.and_then(|r| r.score(&category.key));
        let _ = writeln!(
            fields,
            r#"      <label class="stat"><span class="label">{label}</span><select name="{key}">"#,
            label = escape(&category.label),
            key = escape(&category.key),
        );
        let _ = writeln!(fields, r#"        <option value="">--</option>"#);
        for score in MIN_SCORE..=MAX_SCORE {
            let selected = if current.map(i64::from) == Some(score) {
                " selected"
            } else {
                ""
            };
            let _ = writeln!(
                fields,
                r#"        <option value="{score}"{selected}>{score}</option>"#
            );
        }
        let _ = writeln!(fields, "      </select></label>");
    }

    let due_section = if due.is_empty() {
        r#"<p class="hint">No reports are due today.</p>"#.to_string()
    } else {
        let mut items = String::from("<ul>\n");
        for entry in due {
            let subject = escape(&entry.subject);
            let line = match &entry.draft_url {
                Some(url) => format!(r#"<a href="{}">{subject}</a>"#, escape(url)),
                None => subject,
            };
            let _ = writeln!(items, "        <li>{line}</li>");
        }
        items.push_str("      </ul>\n");
        items.push_str(concat!(
            r#"      <form method="post" action="/reports/send">"#,
            r#"<button type="submit">Send due reports</button></form>"#,
        ));
        items
    };

    let updated = rating
        .and_then(DailyRating::updated_at)
        .map(|at| format!("Last saved {}", escape(at)))
        .unwrap_or_else(|| "Nothing saved yet today.".to_string());

    page(
        &date.to_string(),
        &format!(
            r#"<section>
      <form class="panel" method="post" action="/rate">
{fields}      <button type="submit">Save ratings</button>
      </form>
      <p class="hint">{updated}</p>
    </section>
    <section>
      <h2>Reports</h2>
      {due_section}
    </section>"#
        ),
    )
}

pub fn render_dispatch(date: NaiveDate, results: &[DispatchResult]) -> String {
    let mut list = String::new();
    if results.is_empty() {
        list.push_str(r#"<p class="hint">Nothing left to send.</p>"#);
    } else {
        list.push_str("<ul>\n");
        for result in results {
            let subject = escape(&result.subject);
            let line = match &result.status {
                DispatchStatus::Drafted { url } => {
                    format!(r#"<a href="{}">{subject}</a> (draft)"#, escape(url))
                }
                DispatchStatus::Delivered => format!("{subject} (sent)"),
                DispatchStatus::Failed { error } => {
                    format!("{subject} (failed: {})", escape(error))
                }
            };
            let _ = writeln!(list, "        <li>{line}</li>");
        }
        list.push_str("      </ul>");
    }

    page(
        &date.to_string(),
        &format!(
            r#"<section>
      <h2>Reports</h2>
      {list}
      <p><a href="/">Back</a></p>
    </section>"#
        ),
    )
}

fn page(date: &str, content: &str) -> String {
    PAGE_HTML
        .replace("{{DATE}}", date)
        .replace("{{CONTENT}}", content)
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Daily Ratings</title>
  <style>
    :root {
      --bg-1: #f8f3e6;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg-1);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(860px, 100%);
      background: var(--card);
      border-radius: 28px;
      padding: 36px;
      display: grid;
      gap: 28px;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    .stat {
      background: white;
      border-radius: 18px;
      padding: 18px;
      display: grid;
      gap: 8px;
    }

    .stat .label {
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    button {
      border: none;
      border-radius: 999px;
      padding: 16px 20px;
      font-weight: 600;
      background: var(--accent);
      color: white;
      cursor: pointer;
    }

    .hint {
      margin: 0;
      color: #6f6a65;
      font-size: 0.9rem;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Daily Ratings</h1>
      <p class="hint">{{DATE}}</p>
    </header>
    {{CONTENT}}
  </main>
</body>
</html>
"#;
