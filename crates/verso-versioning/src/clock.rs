//! Source of "today" for lifecycle rules

use chrono::{NaiveDate, Utc};
use std::fmt;
use std::sync::Arc;

/// Supplies the current date
pub trait Clock: Send + Sync + fmt::Debug {
    /// Today's date
    fn today(&self) -> NaiveDate;
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock in UTC
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock frozen on a given date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Default shared clock
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}
