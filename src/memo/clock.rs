//! Clock Module
//!
//! Source of the calendar date and timestamp stamped on each record.

use std::fmt::Debug;

use chrono::{DateTime, Local, NaiveDate};

// == Clock Trait ==
/// Supplies the current local time.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

// == System Clock ==
/// Wall clock in the process's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

// == Fixed Clock ==
/// Always reports the same instant. Useful for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Local>);

impl FixedClock {
    pub fn at(instant: DateTime<Local>) -> Self {
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

// == Call Time ==
/// Date and millisecond timestamp taken from one clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTime {
    pub date: NaiveDate,
    pub timestamp_ms: i64,
}

impl CallTime {
    /// Reads `clock` once.
    pub fn read(clock: &dyn Clock) -> Self {
        let now = clock.now();
        Self {
            date: now.date_naive(),
            timestamp_ms: now.timestamp_millis(),
        }
    }
}
