//! Resource timestamps and the clock the lifecycle reads them against.
//!
//! Tags hold local wall-clock times as `YYYY/MM/DD HH:MM:SS` strings, which
//! is also the pattern the search backend is told to use for range queries.

use super::duration::ParseError;
use chrono::{Local, NaiveDateTime, TimeDelta, Timelike};
use std::time::Duration;

/// `strftime` pattern of the `renewed_at`/`notified_at` tags.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|err| {
        ParseError::InvalidTimestamp {
            value: value.to_string(),
            reason: err.to_string(),
        }
    })
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// `at + by`, failing instead of overflowing.
pub fn shift_forward(at: NaiveDateTime, by: Duration) -> Result<NaiveDateTime, ParseError> {
    TimeDelta::from_std(by)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .ok_or_else(|| ParseError::OutOfRange(format!("{:?}", by)))
}

/// Source of "now" for every lifecycle decision.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock, truncated to whole seconds like the stored tags.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        let now = Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

/// A clock that always answers the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    pub fn at(value: &str) -> Result<Self, ParseError> {
        parse_timestamp(value).map(FixedClock)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
