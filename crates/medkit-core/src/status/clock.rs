//! Sources of "today" for status evaluation.

use chrono::NaiveDate;

/// Provides the calendar date that statuses are evaluated against.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Reads the device's local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Always returns the same date (for tests and explicit overrides).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}
