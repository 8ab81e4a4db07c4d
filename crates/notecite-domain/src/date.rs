//! Structured publication date

use serde::{Deserialize, Serialize};

/// A publication date where only the year is guaranteed.
///
/// Month and day stay `None` when the source does not carry them; consumers
/// must treat absence explicitly rather than reading a zero.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl IssueDate {
    /// A year-only date
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
        }
    }

    /// Builder method to add a month (1-12); out-of-range values are ignored
    pub fn with_month(mut self, month: u32) -> Self {
        if (1..=12).contains(&month) {
            self.month = Some(month);
        }
        self
    }

    /// Builder method to add a day (1-31); out-of-range values are ignored
    pub fn with_day(mut self, day: u32) -> Self {
        if (1..=31).contains(&day) {
            self.day = Some(day);
        }
        self
    }
}
