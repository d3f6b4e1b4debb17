//! Value-comparable time points and the relation between two of them.
//!
//! An instant carries its own UTC offset; a day is a bare calendar date.
//! Comparing an instant with a day goes through the instant's local date.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// How one point in time relates to another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeRelativity {
    Before,
    Same,
    After,
    Unknown,
}

impl TimeRelativity {
    /// The relation seen from the other side.
    pub fn reverse(self) -> Self {
        match self {
            TimeRelativity::Before => TimeRelativity::After,
            TimeRelativity::After => TimeRelativity::Before,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeRelativity::Before => "before",
            TimeRelativity::Same => "same",
            TimeRelativity::After => "after",
            TimeRelativity::Unknown => "unknown",
        }
    }
}

impl From<Ordering> for TimeRelativity {
    fn from(ord: Ordering) -> Self {
        match ord {
            Ordering::Less => TimeRelativity::Before,
            Ordering::Equal => TimeRelativity::Same,
            Ordering::Greater => TimeRelativity::After,
        }
    }
}

impl fmt::Display for TimeRelativity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in time that can be ordered against other points by value alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePoint {
    Instant(DateTime<FixedOffset>),
    Day(NaiveDate),
}

impl TimePoint {
    /// Compare two points.
    ///
    /// Instants order by absolute time and days by date. An instant falling
    /// on the same local date as a day is `Unknown`: it lies inside the day,
    /// neither before nor after it.
    pub fn compare(&self, other: &TimePoint) -> TimeRelativity {
        match (self, other) {
            (TimePoint::Instant(a), TimePoint::Instant(b)) => a.cmp(b).into(),
            (TimePoint::Day(a), TimePoint::Day(b)) => a.cmp(b).into(),
            (TimePoint::Instant(a), TimePoint::Day(b)) => instant_vs_day(a, b),
            (TimePoint::Day(a), TimePoint::Instant(b)) => instant_vs_day(b, a).reverse(),
        }
    }
}

fn instant_vs_day(instant: &DateTime<FixedOffset>, day: &NaiveDate) -> TimeRelativity {
    match instant.date_naive().cmp(day) {
        Ordering::Equal => TimeRelativity::Unknown,
        ord => ord.into(),
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimePoint::Instant(at) => write!(f, "{}", at.to_rfc3339()),
            TimePoint::Day(date) => write!(f, "{date}"),
        }
    }
}
