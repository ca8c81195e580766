use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::HelioError;

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeInterval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, HelioError> {
        if start > end {
            return Err(HelioError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t < self.end
    }

    /// Every calendar date touched by the interval, ascending.
    ///
    /// An interval ending exactly at midnight does not touch the end date,
    /// except when the interval is empty, which still yields its single day.
    pub fn days(&self) -> Vec<NaiveDate> {
        let last = if self.end.time() == NaiveTime::MIN && self.end.date() > self.start.date() {
            self.end.date().pred_opt().unwrap_or(self.end.date())
        } else {
            self.end.date()
        };

        let mut days = Vec::new();
        let mut day = self.start.date();
        while day <= last {
            days.push(day);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        days
    }
}
