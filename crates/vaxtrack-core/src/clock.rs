//! The notion of "today" every date rule is evaluated against.

use chrono::{NaiveDate, Utc};

pub trait Clock: Send + Sync {
  fn today(&self) -> NaiveDate;
}

/// Today's date in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn today(&self) -> NaiveDate { Utc::now().date_naive() }
}

/// A clock pinned to one day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
  fn today(&self) -> NaiveDate { self.0 }
}
