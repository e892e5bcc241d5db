//! Common types and utilities shared across the radar superobservation crates.

pub mod field;
pub mod site;
pub mod time;

pub use field::{is_missing, FieldKind, MISSING};
pub use site::{GeoPoint, RadarSite};
pub use time::{
    analysis_stamp, date_string, parse_compact_time, parse_window_time, unix_seconds, DartTime,
    TimeParseError, DART_DATE_LEN,
};
