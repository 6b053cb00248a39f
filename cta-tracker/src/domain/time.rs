//! Schedule and tracker time handling.
//!
//! The schedule expresses stop times as "HH:MM:SS" offsets into a service day.
//! Service running past midnight keeps counting (e.g. "25:10:00"), so these
//! are not clock times. The trackers report local wall-clock timestamps with no
//! zone, in a handful of textual layouts.

use std::fmt;

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A time of day within a service day, counted in seconds from its start.
///
/// May exceed 24 hours for post-midnight service attributed to the previous day.
///
/// # Examples
///
/// ```
/// use cta_tracker::domain::ServiceTime;
///
/// let t = ServiceTime::parse("25:10:00").unwrap();
/// assert_eq!(t.to_string(), "25:10:00");
/// assert!(t > ServiceTime::parse("23:59:59").unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceTime(u32);

impl ServiceTime {
    /// Create a service time from a number of seconds past the start of the day.
    pub fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    /// Create a service time from a clock time on the service day itself.
    pub fn from_time(time: NaiveTime) -> Self {
        Self(time.num_seconds_from_midnight())
    }

    /// Parse "H:MM:SS" or "HH:MM:SS". Hours may be 24 or more.
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let mut parts = s.trim().split(':');

        let hours = parts
            .next()
            .filter(|p| !p.is_empty() && p.len() <= 3)
            .and_then(parse_digits)
            .ok_or_else(|| TimeError::new("invalid hour digits"))?;
        let minutes = parts
            .next()
            .filter(|p| p.len() == 2)
            .and_then(parse_digits)
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;
        let seconds = parts
            .next()
            .filter(|p| p.len() == 2)
            .and_then(parse_digits)
            .ok_or_else(|| TimeError::new("invalid second digits"))?;

        if parts.next().is_some() {
            return Err(TimeError::new("expected HH:MM:SS format"));
        }
        if minutes > 59 || seconds > 59 {
            return Err(TimeError::new("minutes and seconds must be 0-59"));
        }

        Ok(Self(hours * 3600 + minutes * 60 + seconds))
    }

    /// Seconds since the start of the service day.
    pub fn as_secs(&self) -> u32 {
        self.0
    }

    pub fn hours(&self) -> u32 {
        self.0 / 3600
    }

    pub fn minutes(&self) -> u32 {
        (self.0 / 60) % 60
    }

    pub fn seconds(&self) -> u32 {
        self.0 % 60
    }

    /// The clock time `by` later (or earlier), wrapped into 00:00:00..24:00:00.
    ///
    /// 22:15 shifted by 4h30 is 02:45, not 26:45.
    pub fn shift_clock(self, by: Duration) -> ServiceTime {
        let secs = (i64::from(self.0) + by.num_seconds()).rem_euclid(SECS_PER_DAY);
        ServiceTime(secs as u32)
    }
}

const SECS_PER_DAY: i64 = 24 * 60 * 60;


impl fmt::Display for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours(),
            self.minutes(),
            self.seconds()
        )
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Layouts the trackers use for timestamps.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y%m%d %H:%M:%S",
    "%Y%m%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse a tracker timestamp as a naive local date-time.
///
/// # Examples
///
/// ```
/// use cta_tracker::domain::parse_timestamp;
///
/// let a = parse_timestamp("20150214 11:31:13").unwrap();
/// let b = parse_timestamp("2015-02-14T11:31:13").unwrap();
/// assert_eq!(a, b);
/// assert!(parse_timestamp("yesterday").is_err());
/// ```
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, TimeError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(TimeError::new("empty timestamp"));
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| TimeError::new("unrecognised timestamp layout"))
}
