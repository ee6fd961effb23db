//! Eligibility window for feed entries
//!
//! An entry is eligible when its age lies strictly inside `(delay, days)`,
//! both counted in whole days. `days = 0` therefore admits nothing.
//! The publisher combines this with the ledger check.

use chrono::{NaiveDateTime, TimeDelta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeWindow {
    /// Upper bound, exclusive
    pub days: u32,
    /// Lower bound, exclusive
    pub delay: u32,
}

impl AgeWindow {
    pub fn new(days: u32, delay: u32) -> Self {
        Self { days, delay }
    }

    /// Whether an entry published at `published` is inside the window at `now`
    ///
    /// Both instants are naive; no timezone normalization happens here.
    pub fn contains(&self, published: NaiveDateTime, now: NaiveDateTime) -> bool {
        let age = now - published;
        age < TimeDelta::days(i64::from(self.days)) && age > TimeDelta::days(i64::from(self.delay))
    }
}

impl Default for AgeWindow {
    fn default() -> Self {
        Self::new(1, 0)
    }
}
