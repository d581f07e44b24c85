//! Field-level extraction: HTML adjacent-cell lookup with regex fallback,
//! for every field except `orderId` and `acceptUrl`, which are
//! language-independent and regex-only.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use super::language::LabelSet;

static ORDER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[#(\d+)\]").unwrap());

static ACCEPT_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https://projects\.moravia\.com/Task/[^\s<>"']+/detail/notification\?command=Accept"#).unwrap()
});

static STATUS_FALLBACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"Status[:\s]*['"]?([A-Za-z ]+)['"]?"#).unwrap());

static AMOUNT_FALLBACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)amountWords[:\s]*['"]?([\d.,]+)"#).unwrap());

static PLANNED_END_FALLBACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)Planned[\s_]?end[:\s]*['"]?([^'"\n]+)['"]?"#).unwrap());

static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());

const DATE_FORMATS: &[&str] = &[
    "%d.%m.%Y %I:%M %p",
    "%d.%m.%Y %I:%M%p",
    "%d/%m/%Y %I:%M %p",
    "%d-%m-%Y %I:%M %p",
    "%Y-%m-%d %H:%M",
];

const DATE_ONLY_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

pub fn extract_order_id(raw_text: &str) -> Option<String> {
    ORDER_ID
        .captures(raw_text)
        .map(|caps| caps[1].to_string())
}

/// Every accept-URL occurrence in the body, in order of appearance.
pub fn extract_accept_urls(body: &str) -> Vec<String> {
    ACCEPT_URL
        .find_iter(body)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Find a table cell whose trimmed text matches one of `labels`
/// case-insensitively, and return the trimmed text of the next cell in
/// the same row.
fn adjacent_cell(html: &Html, labels: &[&str]) -> Option<String> {
    let row_selector = Selector::parse("tr").ok()?;
    let cell_selector = Selector::parse("td, th").ok()?;

    for row in html.select(&row_selector) {
        let cells: Vec<_> = row.select(&cell_selector).collect();
        for (idx, cell) in cells.iter().enumerate() {
            let text = cell.text().collect::<String>().trim().to_string();
            if labels.iter().any(|label| text.eq_ignore_ascii_case(label)) {
                if let Some(next) = cells.get(idx + 1) {
                    let value = next.text().collect::<String>().trim().to_string();
                    if !value.is_empty() {
                        return Some(value);
                    }
                }
            }
        }
    }
    None
}

pub fn extract_status(html: Option<&Html>, raw_text: &str, labels: &LabelSet) -> Option<String> {
    if let Some(html) = html {
        if let Some(value) = adjacent_cell(html, labels.status) {
            return Some(value);
        }
    }
    STATUS_FALLBACK
        .captures(raw_text)
        .map(|caps| caps[1].trim().to_string())
}

pub fn extract_workflow_name(html: Option<&Html>, labels: &LabelSet) -> Option<String> {
    html.and_then(|html| adjacent_cell(html, labels.workflow_name))
}

fn strip_thousands_separators(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect()
}

pub fn extract_amount_words(html: Option<&Html>, raw_text: &str, labels: &LabelSet) -> Option<f64> {
    let raw_value = html
        .and_then(|html| adjacent_cell(html, labels.amounts))
        .or_else(|| {
            AMOUNT_FALLBACK
                .captures(raw_text)
                .map(|caps| caps[1].to_string())
        })?;

    let cleaned = strip_thousands_separators(&raw_value);
    cleaned.parse::<f64>().ok()
}

fn parse_planned_end(raw: &str) -> Option<String> {
    let cleaned = PARENTHESIZED.replace_all(raw, "").trim().to_string();

    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Some(parsed.format("%Y-%m-%d %H:%M").to_string());
        }
    }
    for format in DATE_ONLY_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            let datetime = date.and_time(NaiveTime::MIN);
            return Some(datetime.format("%Y-%m-%d %H:%M").to_string());
        }
    }
    None
}

pub fn extract_planned_end_date(html: Option<&Html>, raw_text: &str, labels: &LabelSet) -> Option<String> {
    let raw_value = html
        .and_then(|html| adjacent_cell(html, labels.planned_end))
        .or_else(|| {
            PLANNED_END_FALLBACK
                .captures(raw_text)
                .map(|caps| caps[1].to_string())
        })?;

    parse_planned_end(&raw_value)
}
