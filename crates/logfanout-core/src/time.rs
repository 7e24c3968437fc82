//! Event-time parsing and logdate formatting.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::TimeFormatError;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Bucket granularity of a logdate.
///
/// Levels 1 and 2 are compact keys (`20240309`, `2024030907`); levels 3 to 6
/// keep one more separated calendar component each. The numeric level is
/// what configuration files carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatePrecision {
    DayKey = 1,
    HourKey = 2,
    Day = 3,
    Hour = 4,
    Minute = 5,
    Second = 6,
}

impl DatePrecision {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::DayKey),
            2 => Some(Self::HourKey),
            3 => Some(Self::Day),
            4 => Some(Self::Hour),
            5 => Some(Self::Minute),
            6 => Some(Self::Second),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    fn format_str(self) -> &'static str {
        match self {
            Self::DayKey => "%Y%m%d",
            Self::HourKey => "%Y%m%d%H",
            Self::Day => "%Y-%m-%d",
            Self::Hour => "%Y-%m-%d %H",
            Self::Minute => "%Y-%m-%d %H:%M",
            Self::Second => "%Y-%m-%d %H:%M:%S",
        }
    }
}

/// Parse an event time into a UTC timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM:SS`, the same with a `T` separator (both with
/// optional fractional seconds), and RFC 3339 with an explicit offset.
/// Times without an offset are taken as UTC.
pub fn parse_time(input: &str) -> Result<DateTime<Utc>, TimeFormatError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(TimeFormatError::new(input, "empty event time"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(TimeFormatError::new(
        input,
        "expected 'YYYY-MM-DD HH:MM:SS', 'YYYY-MM-DDTHH:MM:SS' or RFC 3339",
    ))
}

/// Format a timestamp as a logdate bucket at the given precision.
pub fn format_date(ts: &DateTime<Utc>, precision: DatePrecision) -> String {
    ts.format(precision.format_str()).to_string()
}
