//! Calendar-week bucketing.
//!
//! Weeks follow ISO 8601 numbering: they start on Monday and the ISO year of a
//! late-December or early-January date can differ from its calendar year
//! (2024-12-30 belongs to 2025-W01).

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ISO (year, week) pair. Orders by year, then week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

pub fn week_key(instant: DateTime<Utc>) -> WeekKey {
    let iso = instant.iso_week();
    WeekKey {
        year: iso.year(),
        week: iso.week(),
    }
}

/// Every week touched by `[earliest, latest]`, in order and without gaps.
///
/// Returns an empty axis when `earliest` is after `latest`.
pub fn weeks_between(earliest: DateTime<Utc>, latest: DateTime<Utc>) -> Vec<WeekKey> {
    if earliest > latest {
        return Vec::new();
    }

    let last = week_key(latest);
    let mut monday = monday_of(earliest.date_naive());
    let mut weeks = Vec::new();

    loop {
        let key = naive_week_key(monday);
        weeks.push(key);
        if key >= last {
            break;
        }
        monday += Duration::weeks(1);
    }

    weeks
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn naive_week_key(date: NaiveDate) -> WeekKey {
    let iso = date.iso_week();
    WeekKey {
        year: iso.year(),
        week: iso.week(),
    }
}
