// File: ./src/model/recurrence.rs
//! Recurrence rules carried by `@recur(...)` and the next-start computation.
//!
//! Five shapes are understood:
//!
//! | Payload                              | Shape           |
//! |--------------------------------------|-----------------|
//! | `3d`, `2w`, `1m`, `1y`               | simple interval |
//! | `from:2024-01-01,every:7d`           | fixed anchor    |
//! | `monthly,day=15` / `monthly,day=last`| monthly-by-day  |
//! | `yearly,month=mar,day=last`          | yearly-by-day   |
//! | `mon,wed,fri`                        | weekday set     |
//!
//! Anything else is not a rule and the task is treated as non-recurring.
use crate::model::date::{clamped_date, days_in_month, format_ymd};
use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static INTERVAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(\d+)\s*([dwmy])$").unwrap());
static ANCHORED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^from:\s*(\d{4})-(\d{2})-(\d{2})\s*,\s*every:\s*(\d+)\s*([dwmy])$").unwrap()
});
static MONTHLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^monthly\s*,\s*day\s*=\s*(\d+|last)$").unwrap());
static YEARLY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^yearly\s*,\s*month\s*=\s*(\d{1,2}|[a-z]{3})\s*,\s*day\s*=\s*(\d+|last)$")
        .unwrap()
});

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Day,
    Week,
    Month,
    Year,
}

impl IntervalUnit {
    fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "d" => Some(Self::Day),
            "w" => Some(Self::Week),
            "m" => Some(Self::Month),
            "y" => Some(Self::Year),
            _ => None,
        }
    }

    fn code(self) -> char {
        match self {
            Self::Day => 'd',
            Self::Week => 'w',
            Self::Month => 'm',
            Self::Year => 'y',
        }
    }

    /// Adds `count` units to `date`. Month and year steps clamp to the end of the
    /// target month, so Jan 31 + 1 month is Feb 29 (or 28), never early March.
    pub fn add(self, date: NaiveDate, count: u32) -> Option<NaiveDate> {
        match self {
            Self::Day => date.checked_add_days(Days::new(count.into())),
            Self::Week => date.checked_add_days(Days::new(u64::from(count) * 7)),
            Self::Month => date.checked_add_months(Months::new(count)),
            Self::Year => date.checked_add_months(Months::new(count.checked_mul(12)?)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySpec {
    Day(u32),
    Last,
}

impl DaySpec {
    fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("last") {
            return Some(Self::Last);
        }
        match raw.parse::<u32>().ok()? {
            d @ 1..=31 => Some(Self::Day(d)),
            _ => None,
        }
    }

    fn resolve(self, year: i32, month: u32) -> Option<NaiveDate> {
        match self {
            Self::Day(d) => clamped_date(year, month, d),
            Self::Last => NaiveDate::from_ymd_opt(year, month, days_in_month(year, month)),
        }
    }
}

impl fmt::Display for DaySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaySpec::Day(d) => write!(f, "{}", d),
            DaySpec::Last => write!(f, "last"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceRule {
    /// `N{d|w|m|y}` counted from the task's current start (or today).
    Interval { count: u32, unit: IntervalUnit },
    /// `from:DATE,every:N{d|w|m|y}`: occurrences are pinned to a fixed grid.
    Anchored {
        from: NaiveDate,
        count: u32,
        unit: IntervalUnit,
    },
    MonthlyByDay(DaySpec),
    /// Always lands in the year after the anchor's year.
    YearlyByDay { month: u32, day: DaySpec },
    Weekdays(Vec<Weekday>),
}

fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_month(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    let lower = raw.to_lowercase();
    MONTH_NAMES
        .iter()
        .position(|m| *m == lower)
        .map(|i| i as u32 + 1)
}

fn parse_count(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|n| *n > 0)
}

impl RecurrenceRule {
    /// Parses an `@recur(...)` payload. Malformed payloads yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();

        if let Some(caps) = INTERVAL_RE.captures(raw) {
            return Some(Self::Interval {
                count: parse_count(&caps[1])?,
                unit: IntervalUnit::from_code(&caps[2])?,
            });
        }

        if let Some(caps) = ANCHORED_RE.captures(raw) {
            let from = NaiveDate::from_ymd_opt(
                caps[1].parse().ok()?,
                caps[2].parse().ok()?,
                caps[3].parse().ok()?,
            )?;
            return Some(Self::Anchored {
                from,
                count: parse_count(&caps[4])?,
                unit: IntervalUnit::from_code(&caps[5])?,
            });
        }

        if let Some(caps) = MONTHLY_RE.captures(raw) {
            return Some(Self::MonthlyByDay(DaySpec::parse(&caps[1])?));
        }

        if let Some(caps) = YEARLY_RE.captures(raw) {
            return Some(Self::YearlyByDay {
                month: parse_month(&caps[1])?,
                day: DaySpec::parse(&caps[2])?,
            });
        }

        let days: Option<Vec<Weekday>> = raw.split(',').map(parse_weekday).collect();
        match days {
            Some(days) if !days.is_empty() => Some(Self::Weekdays(days)),
            _ => None,
        }
    }

    /// The fixed-anchor shape compares against the UTC calendar day.
    pub fn is_fixed_anchor(&self) -> bool {
        matches!(self, Self::Anchored { .. })
    }

    /// Computes the next start date.
    ///
    /// `anchor` is the task's current start date (or today when it has none) and is
    /// ignored by the fixed-anchor shape, which instead advances its embedded date until
    /// it is strictly after `today`. Every other shape returns a date strictly after
    /// `anchor`. `None` for a zero-length interval or a result outside chrono's range.
    pub fn next_occurrence(&self, anchor: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Interval { count: 0, .. } => None,
            Self::Interval { count, unit } => unit.add(anchor, *count),
            Self::Anchored { from, count, unit } => catch_up(*from, *count, *unit, today),
            Self::MonthlyByDay(day) => {
                let (year, month) = if anchor.month() == 12 {
                    (anchor.year() + 1, 1)
                } else {
                    (anchor.year(), anchor.month() + 1)
                };
                day.resolve(year, month)
            }
            Self::YearlyByDay { month, day } => day.resolve(anchor.year() + 1, *month),
            Self::Weekdays(days) => {
                let current = anchor.weekday().num_days_from_monday();
                let offset = days
                    .iter()
                    .map(|d| match (d.num_days_from_monday() + 7 - current) % 7 {
                        0 => 7,
                        n => n,
                    })
                    .min()?;
                anchor.checked_add_days(Days::new(offset.into()))
            }
        }
    }
}

/// First grid point `from + k * step` (k >= 0) strictly after `today`.
///
/// Each candidate is computed from `from` directly, so month-end clamping on one
/// step never shifts the following ones.
fn catch_up(from: NaiveDate, count: u32, unit: IntervalUnit, today: NaiveDate) -> Option<NaiveDate> {
    if count == 0 {
        return None;
    }
    if from > today {
        return Some(from);
    }

    let mut k: u32 = match unit {
        IntervalUnit::Day | IntervalUnit::Week => {
            let step = i64::from(count) * if unit == IntervalUnit::Week { 7 } else { 1 };
            let elapsed = (today - from).num_days();
            u32::try_from(elapsed / step + 1).ok()?
        }
        IntervalUnit::Month | IntervalUnit::Year => {
            let step = i64::from(count) * if unit == IntervalUnit::Year { 12 } else { 1 };
            let elapsed = i64::from(today.year() - from.year()) * 12 + i64::from(today.month())
                - i64::from(from.month());
            u32::try_from(elapsed / step).ok()?
        }
    };

    loop {
        let candidate = unit.add(from, count.checked_mul(k)?)?;
        if candidate > today {
            return Some(candidate);
        }
        k = k.checked_add(1)?;
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceRule::Interval { count, unit } => write!(f, "{}{}", count, unit.code()),
            RecurrenceRule::Anchored { from, count, unit } => {
                write!(f, "from:{},every:{}{}", format_ymd(*from), count, unit.code())
            }
            RecurrenceRule::MonthlyByDay(day) => write!(f, "monthly,day={}", day),
            RecurrenceRule::YearlyByDay { month, day } => {
                match MONTH_NAMES.get((*month as usize).wrapping_sub(1)) {
                    Some(name) => write!(f, "yearly,month={},day={}", name, day),
                    None => write!(f, "yearly,month={},day={}", month, day),
                }
            }
            RecurrenceRule::Weekdays(days) => {
                let names: Vec<String> = days
                    .iter()
                    .map(|d| d.to_string().to_lowercase())
                    .collect();
                write!(f, "{}", names.join(","))
            }
        }
    }
}
