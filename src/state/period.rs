//! Period arithmetic
//!
//! Pure calendar math over `NaiveDate`: period ranges, period identifier
//! strings, display labels, and previous/next navigation. `NaiveDate`
//! carries no timezone, so none of this can drift across DST transitions;
//! the only clock read in the crate is "today" at state construction.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// The navigation period a date header cycles through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Quarter => "quarter",
            Period::Year => "year",
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

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "quarter" => Ok(Period::Quarter),
            "year" => Ok(Period::Year),
            other => Err(format!("unknown period '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Start and end (both inclusive) of the period containing `date`.
/// Always satisfies `start <= date <= end`.
pub fn period_range(date: NaiveDate, period: Period) -> (NaiveDate, NaiveDate) {
    match period {
        Period::Day => (date, date),
        Period::Week => {
            // ISO week, Monday first
            let monday = date - Days::new(date.weekday().num_days_from_monday() as u64);
            (monday, monday + Days::new(6))
        }
        Period::Month => {
            let first = date.with_day(1).unwrap_or(date);
            (first, first + Months::new(1) - Days::new(1))
        }
        Period::Quarter => {
            let quarter_start_month = (date.month0() / 3) * 3 + 1;
            let first = NaiveDate::from_ymd_opt(date.year(), quarter_start_month, 1)
                .unwrap_or(date);
            (first, first + Months::new(3) - Days::new(1))
        }
        Period::Year => {
            let first = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);
            let last = NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date);
            (first, last)
        }
    }
}

/// The date representing the adjacent period: one day/week over, or the
/// first day of the adjacent month/quarter/year (pinning to day 1 avoids
/// month-length skipping).
pub fn adjacent_date(date: NaiveDate, period: Period, direction: Direction) -> NaiveDate {
    let forward = direction == Direction::Next;
    match period {
        Period::Day => step_days(date, 1, forward),
        Period::Week => step_days(date, 7, forward),
        Period::Month => step_months(date.with_day(1).unwrap_or(date), 1, forward),
        Period::Quarter => step_months(date.with_day(1).unwrap_or(date), 3, forward),
        Period::Year => {
            let first = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);
            step_months(first, 12, forward)
        }
    }
}

fn step_days(date: NaiveDate, days: u64, forward: bool) -> NaiveDate {
    if forward {
        date + Days::new(days)
    } else {
        date - Days::new(days)
    }
}

fn step_months(date: NaiveDate, months: u32, forward: bool) -> NaiveDate {
    if forward {
        date + Months::new(months)
    } else {
        date - Months::new(months)
    }
}

/// The period identifier string: day `YYYY-MM-DD`, week ISO `YYYY-Www`,
/// month `YYYY-MM`, quarter `YYYY-Qn`, year `YYYY`.
pub fn period_id(date: NaiveDate, period: Period) -> String {
    match period {
        Period::Day => date.format("%Y-%m-%d").to_string(),
        Period::Week => {
            let week = date.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        Period::Month => date.format("%Y-%m").to_string(),
        Period::Quarter => format!("{}-Q{}", date.year(), date.month0() / 3 + 1),
        Period::Year => date.year().to_string(),
    }
}

/// Display string for the date-navigator header.
pub fn period_label(date: NaiveDate, period: Period) -> String {
    let (start, end) = period_range(date, period);
    match period {
        Period::Day => date.format("%b %d, %Y").to_string(),
        Period::Week => format!(
            "Week {}: {} - {}, {}",
            date.iso_week().week(),
            start.format("%b %d"),
            end.format("%b %d"),
            start.year()
        ),
        Period::Month => date.format("%B %Y").to_string(),
        Period::Quarter => format!("Q{} {}", date.month0() / 3 + 1, date.year()),
        Period::Year => date.year().to_string(),
    }
}
