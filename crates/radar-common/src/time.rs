//! Time handling for radar volumes and observation records.
//!
//! Observation records carry their time three ways: seconds since the Unix
//! epoch, a fixed-width date string, and a (day, second) pair counted from
//! 1601-01-01 00:00:00 UTC, the calendar base used by the assimilation system.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Seconds between 1601-01-01 and 1970-01-01.
const DART_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

const SECONDS_PER_DAY: i64 = 86_400;

/// Width of the `date` column, e.g. `2023-05-10_21:30:00`.
pub const DART_DATE_LEN: usize = 19;

/// Day/second pair relative to 1601-01-01 00:00:00 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DartTime {
    pub days: i64,
    pub seconds: i64,
}

impl DartTime {
    pub fn from_datetime(t: &DateTime<Utc>) -> Self {
        let total = t.timestamp() + DART_EPOCH_OFFSET_SECS;
        Self {
            days: total.div_euclid(SECONDS_PER_DAY),
            seconds: total.rem_euclid(SECONDS_PER_DAY),
        }
    }
}

/// Seconds since 1970-01-01 00:00:00 UTC, with sub-second precision.
pub fn unix_seconds(t: &DateTime<Utc>) -> f64 {
    t.timestamp() as f64 + f64::from(t.timestamp_subsec_micros()) * 1.0e-6
}

/// Fixed-width `%Y-%m-%d_%H:%M:%S` representation.
pub fn date_string(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d_%H:%M:%S").to_string()
}

/// `YYYYmmdd_HHMM` stamp used in output file names.
pub fn analysis_stamp(t: &DateTime<Utc>) -> String {
    t.format("%Y%m%d_%H%M").to_string()
}

/// Parse the `YYYYmmdd_HHMMSS` stamp embedded in Level-II file names.
pub fn parse_compact_time(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    NaiveDateTime::parse_from_str(s, "%Y%m%d_%H%M%S")
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .map_err(|_| TimeParseError::InvalidFormat(s.to_string()))
}

/// Parse an analysis window time.
///
/// Accepts `YYYY,MM,DD,HH,MM` (the command-line form), `YYYYmmddHHMM`,
/// or RFC 3339.
pub fn parse_window_time(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    if s.contains(',') {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| TimeParseError::InvalidFormat(s.to_string()))?;
        if parts.len() != 5 {
            return Err(TimeParseError::InvalidFormat(s.to_string()));
        }
        return Utc
            .with_ymd_and_hms(parts[0] as i32, parts[1], parts[2], parts[3], parts[4], 0)
            .single()
            .ok_or_else(|| TimeParseError::InvalidFormat(s.to_string()));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(&format!("{}00", s), "%Y%m%d%H%M%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TimeParseError::InvalidFormat(s.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}
