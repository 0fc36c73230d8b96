//! Source of "today" for streak settlement.

use chrono::{NaiveDate, Utc};
use std::fmt::Debug;

/// Supplies the current UTC calendar date.
pub trait Clock: Debug + Send + Sync {
    /// Today's date in UTC.
    fn today(&self) -> NaiveDate;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock pinned to one date, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
