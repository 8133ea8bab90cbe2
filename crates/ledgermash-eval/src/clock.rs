//! Clock sources for the run's captured "now".

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Supplies the instant a run treats as "now". Read once per run.
pub trait ClockProvider: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[cfg(feature = "system-clock")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[cfg(feature = "system-clock")]
impl ClockProvider for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A frozen instant, for reproducible runs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self(at)
    }

    /// Midnight at the start of `date`.
    pub fn at_date(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::MIN))
    }
}

impl ClockProvider for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Whole days from `date` (at midnight) to `now`, floored. Past dates are positive.
pub fn days_since(date: NaiveDate, now: NaiveDateTime) -> i64 {
    let secs = (now - date.and_time(NaiveTime::MIN)).num_seconds();
    secs.div_euclid(86_400)
}

/// Calendar-month distance from `now` to `date`, ignoring days of month.
pub fn months_until(date: NaiveDate, now: NaiveDateTime) -> i64 {
    use chrono::Datelike;
    let now = now.date();
    (i64::from(date.year()) - i64::from(now.year())) * 12 + i64::from(date.month())
        - i64::from(now.month())
}
