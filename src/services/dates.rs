//! Timezone-aware date parsing and formatting
//!
//! Report windows are always carried as UTC instants. User input is read in
//! the report time zone, which is either UTC, the machine's local zone, or a
//! fixed offset.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Days, Duration, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime,
    NaiveTime, TimeZone, Utc,
};

use crate::types::{ReportError, Result};

/// Accepted layouts for date-time input without an explicit offset
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time zone used to interpret and render report dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportTimeZone {
    #[default]
    Utc,
    Local,
    Fixed(FixedOffset),
}

impl FromStr for ReportTimeZone {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "utc" | "z" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            _ => parse_offset(trimmed).map(Self::Fixed),
        }
    }
}

impl fmt::Display for ReportTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utc => write!(f, "utc"),
            Self::Local => write!(f, "local"),
            Self::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

impl ReportTimeZone {
    /// Resolve a wall-clock time in this zone to a UTC instant.
    pub fn resolve(&self, naive: &NaiveDateTime) -> Result<DateTime<Utc>> {
        match self {
            Self::Utc => Ok(Utc.from_utc_datetime(naive)),
            Self::Local => resolve_in(&Local, naive),
            Self::Fixed(offset) => resolve_in(offset, naive),
        }
    }

    /// Calendar date of `instant` in this zone
    pub fn date_of(&self, instant: &DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Utc => instant.date_naive(),
            Self::Local => instant.with_timezone(&Local).date_naive(),
            Self::Fixed(offset) => instant.with_timezone(offset).date_naive(),
        }
    }

    /// Offset string for the search service's `time_zone` parameter
    pub fn query_offset(&self, at: &DateTime<Utc>) -> String {
        match self {
            Self::Utc => "+00:00".to_string(),
            Self::Local => at.with_timezone(&Local).offset().to_string(),
            Self::Fixed(offset) => offset.to_string(),
        }
    }
}

fn resolve_in<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> Result<DateTime<Utc>> {
    earliest_instant(tz.from_local_datetime(naive), naive)
}

/// Pick one instant for a wall-clock time that may be ambiguous or missing.
fn earliest_instant<Tz: TimeZone>(
    result: LocalResult<DateTime<Tz>>,
    naive: &NaiveDateTime,
) -> Result<DateTime<Utc>> {
    match result {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        // DST fall-back: the wall-clock time occurs twice, take the first
        LocalResult::Ambiguous(earlier, _) => Ok(earlier.with_timezone(&Utc)),
        LocalResult::None => Err(ReportError::InvalidDate {
            input: naive.to_string(),
            reason: "local time does not exist in this time zone".into(),
        }),
    }
}

/// Parse `+HH:MM`, `+HHMM` or `+HH` into a fixed offset.
fn parse_offset(s: &str) -> Result<FixedOffset> {
    let invalid =
        |reason: &str| ReportError::Config(format!("invalid time zone '{}': {}", s, reason));

    let (sign, rest) = match s.chars().next() {
        Some('+') => (1, &s[1..]),
        Some('-') => (-1, &s[1..]),
        _ => return Err(invalid("expected utc, local or an offset like +02:00")),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("offset must be numeric"));
    }

    let (hours, minutes) = match digits.len() {
        2 => (&digits[..2], "0"),
        4 => (&digits[..2], &digits[2..]),
        _ => return Err(invalid("offset must have 2 or 4 digits")),
    };

    let hours: i32 = hours.parse().map_err(|_| invalid("bad hours"))?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid("bad minutes"))?;
    if minutes >= 60 {
        return Err(invalid("minutes out of range"));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| invalid("offset out of range"))
}

/// Parse a user supplied date string into a UTC instant.
///
/// RFC 3339 input carries its own offset. Everything else is read in `tz`:
/// a bare date means midnight, a date-time is taken as wall-clock time, and
/// a bare integer is epoch milliseconds.
pub fn parse_date(input: &str, tz: ReportTimeZone) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ReportError::InvalidDate {
            input: input.to_string(),
            reason: "empty date".into(),
        });
    }

    if let Ok(millis) = trimmed.parse::<i64>() {
        return DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
            ReportError::InvalidDate {
                input: input.to_string(),
                reason: "epoch milliseconds out of range".into(),
            }
        });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return tz.resolve(&naive);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return start_of_day(date, tz);
    }

    Err(ReportError::InvalidDate {
        input: input.to_string(),
        reason: "expected YYYY-MM-DD, YYYY-MM-DD HH:MM[:SS], RFC 3339 or epoch millis".into(),
    })
}

/// Render `instant` as `YYYY-MM-DD` in `tz`.
pub fn date_to_string(instant: &DateTime<Utc>, tz: ReportTimeZone) -> String {
    tz.date_of(instant).format(DATE_FORMAT).to_string()
}

/// Midnight of `date` in `tz`, as a UTC instant
pub fn start_of_day(date: NaiveDate, tz: ReportTimeZone) -> Result<DateTime<Utc>> {
    start_of_day_with(date, |naive| tz.resolve(naive))
}

fn start_of_day_with<F>(date: NaiveDate, resolve: F) -> Result<DateTime<Utc>>
where
    F: Fn(&NaiveDateTime) -> Result<DateTime<Utc>>,
{
    let midnight = date.and_time(NaiveTime::MIN);
    match resolve(&midnight) {
        Ok(dt) => Ok(dt),
        Err(_) => {
            // DST spring-forward at midnight: use 01:00
            resolve(&(midnight + Duration::hours(1)))
        }
    }
}

/// Default report window: the `days` full days before today in `tz`.
pub fn default_window(
    now: DateTime<Utc>,
    tz: ReportTimeZone,
    days: u32,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let today = tz.date_of(&now);
    let first = today
        .checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(|| ReportError::InvalidDate {
            input: format!("{} days before {}", days, today),
            reason: "date out of range".into(),
        })?;
    Ok((start_of_day(first, tz)?, start_of_day(today, tz)?))
}
