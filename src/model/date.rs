// File: src/model/date.rs
//! Calendar-date resolution for `@start(...)` and `@due(...)` expressions.
//!
//! Dates are plain `NaiveDate` values: no time of day and no timezone.
use chrono::{Datelike, Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

static ISO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").unwrap());
static RELATIVE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^today\+(\d+)d$").unwrap());

/// Resolves a date expression against `today`.
///
/// Accepted forms are a leading `YYYY-MM-DD` (anything after it, such as `T09:30`, is
/// ignored) and `today+Nd`. Impossible calendar dates such as `2024-02-30` are rejected
/// rather than rolled over into the next month.
pub fn resolve_expr(expr: &str, today: NaiveDate) -> Option<NaiveDate> {
    let expr = expr.trim();

    if let Some(caps) = ISO_RE.captures(expr) {
        let year = caps[1].parse::<i32>().ok()?;
        let month = caps[2].parse::<u32>().ok()?;
        let day = caps[3].parse::<u32>().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = RELATIVE_RE.captures(expr) {
        let offset = caps[1].parse::<u64>().ok()?;
        return today.checked_add_days(Days::new(offset));
    }

    None
}

/// Orders two values by calendar day only. A `NaiveDateTime` late in the evening still
/// compares as `Equal` to the bare date of the same day.
pub fn compare_ymd<A: Datelike, B: Datelike>(a: &A, b: &B) -> Ordering {
    (a.year(), a.month(), a.day()).cmp(&(b.year(), b.month(), b.day()))
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Builds a date, clamping `day` into the month (`31` in April becomes `30`).
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn format_ymd(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
