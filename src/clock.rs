// File: ./src/clock.rs
//! Source of "today" for eligibility and recurrence.
use chrono::{Local, NaiveDate, Utc};

pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The local calendar day.
    fn today(&self) -> NaiveDate;

    /// The UTC calendar day, used by fixed-anchor recurrences.
    fn today_utc(&self) -> NaiveDate {
        self.today()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn today_utc(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock pinned to one date, for tests and `--today`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
