//! Service-date time handling.
//!
//! Schedule times are stored as seconds since local midnight of a trip's
//! *service date*. A trip that runs past midnight keeps its earlier service
//! date and reports times of 24:00:00 or later, so converting a schedule
//! time into a wall-clock instant has to carry whole days into the date
//! before the remainder is added.

use std::fmt;

use chrono::{Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Number of seconds in a (non-DST) calendar day.
pub const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// Error returned when parsing an invalid time-of-day string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time of day: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Seconds since local midnight of a service date.
///
/// Unlike a wall-clock time this may exceed 24 hours: `25:00:00` is one
/// o'clock in the morning of the day *after* the service date.
///
/// # Examples
///
/// ```
/// use dash_core::domain::TimeOfDay;
///
/// let t = TimeOfDay::parse_hms("25:10:00").unwrap();
/// assert_eq!(t.as_seconds(), 90_600);
/// assert!(t.is_overnight());
/// assert_eq!(t.to_string(), "25:10:00");
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    /// Create a time from raw seconds past service-date midnight.
    pub const fn from_seconds(secs: u32) -> Self {
        Self(secs)
    }

    /// Create a time from hours, minutes and seconds. Hours may exceed 23.
    pub const fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self(hours * 3600 + minutes * 60 + seconds)
    }

    /// Returns the raw number of seconds.
    pub const fn as_seconds(&self) -> u32 {
        self.0
    }

    /// Whole days this time lies past its service date.
    pub const fn days_overflow(&self) -> u32 {
        self.0 / SECONDS_PER_DAY
    }

    /// Returns true if this time falls on a later calendar day than its
    /// service date.
    pub const fn is_overnight(&self) -> bool {
        self.0 >= SECONDS_PER_DAY
    }

    /// Parse `HH:MM:SS`, where `HH` may be 24 or more.
    ///
    /// Single-digit hours (`8:05:00`) are accepted, as schedule feeds
    /// commonly omit the leading zero.
    pub fn parse_hms(s: &str) -> Result<Self, TimeError> {
        let mut parts = s.trim().split(':');
        let (Some(h), Some(m), Some(sec), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TimeError::new("expected HH:MM:SS format"));
        };

        if h.is_empty() || !h.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TimeError::new("invalid hour digits"));
        }
        let hours: u32 = h.parse().map_err(|_| TimeError::new("hour out of range"))?;

        let minutes = parse_two_digits(m).ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minutes > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        let seconds = parse_two_digits(sec).ok_or_else(|| TimeError::new("invalid second digits"))?;
        if seconds > 59 {
            return Err(TimeError::new("second must be 0-59"));
        }

        hours
            .checked_mul(3600)
            .and_then(|h| h.checked_add(minutes * 60 + seconds))
            .map(Self)
            .ok_or_else(|| TimeError::new("hour out of range"))
    }
}

impl fmt::Debug for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeOfDay({self})")
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.0 / 3600;
        let m = (self.0 % 3600) / 60;
        let s = self.0 % 60;
        write!(f, "{h:02}:{m:02}:{s:02}")
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = TimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hms(&value)
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

fn parse_two_digits(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}

/// Convert a service date plus schedule time into an absolute local instant.
///
/// Overflowing days are carried into the date first, so `25:00:00` on
/// 2024-03-01 is 01:00 on 2024-03-02.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use dash_core::domain::{TimeOfDay, resolve};
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let instant = resolve(date, TimeOfDay::from_seconds(90_000));
/// assert_eq!(instant.to_string(), "2024-03-02 01:00:00");
/// ```
pub fn resolve(service_date: NaiveDate, time: TimeOfDay) -> NaiveDateTime {
    let date = service_date + Days::new(u64::from(time.days_overflow()));
    let remainder = time.as_seconds() % SECONDS_PER_DAY;
    NaiveDateTime::new(date, NaiveTime::MIN) + Duration::seconds(i64::from(remainder))
}

/// Seconds elapsed since local midnight of the instant's own date.
pub fn seconds_since_midnight(instant: NaiveDateTime) -> TimeOfDay {
    TimeOfDay(instant.time().num_seconds_from_midnight())
}
