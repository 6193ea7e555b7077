//! Calendar bucket keys for history timestamps.
//!
//! Keys sort lexically in chronological order: `2025-03-07 H09` (hour),
//! `2025-03-07` (day), `2025-W10` (ISO week), `2025-03` (month), `2025` (year).
//! Years are zero-padded to four digits, so the order holds for years 0 to 9999.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use clap::ValueEnum;

use crate::error::UsageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Granularity {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            "year" => Ok(Granularity::Year),
            other => Err(UsageError::InvalidGranularity(other.to_string())),
        }
    }
}

/// Bucket key in the process's local time zone.
///
/// Returns `None` only for timestamps outside chrono's representable range.
pub fn bucket_key(timestamp_ms: i64, granularity: Granularity) -> Option<String> {
    bucket_key_in(timestamp_ms, granularity, &Local)
}

pub fn bucket_key_in<Tz: TimeZone>(
    timestamp_ms: i64,
    granularity: Granularity,
    tz: &Tz,
) -> Option<String> {
    let at = DateTime::from_timestamp_millis(timestamp_ms)?.with_timezone(tz);
    let (year, month, day) = (at.year(), at.month(), at.day());

    let key = match granularity {
        Granularity::Hour => format!("{year:04}-{month:02}-{day:02} H{:02}", at.hour()),
        Granularity::Day => format!("{year:04}-{month:02}-{day:02}"),
        // ISO 8601: the week, and its year, are those of the week's Thursday.
        Granularity::Week => {
            let week = at.date_naive().iso_week();
            format!("{:04}-W{:02}", week.year(), week.week())
        }
        Granularity::Month => format!("{year:04}-{month:02}"),
        Granularity::Year => format!("{year:04}"),
    };
    Some(key)
}
