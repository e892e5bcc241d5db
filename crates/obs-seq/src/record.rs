//! Observation records and tables.

use chrono::{DateTime, Utc};
use radar_common::FieldKind;
use serde::{Deserialize, Serialize};

/// One observation handed to the assimilation system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub value: f32,
    /// Degrees north
    pub lat: f64,
    /// Degrees east
    pub lon: f64,
    /// Meters above mean sea level
    pub height: f64,
    /// Observation error variance
    pub error_var: f32,
    /// Seconds since 1970-01-01 00:00:00 UTC
    pub utime: f64,
    /// `%Y-%m-%d_%H:%M:%S`
    pub date: String,
    /// Days since 1601-01-01
    pub day: i64,
    /// Seconds into `day`
    pub second: i64,
    pub platform_lat: f64,
    pub platform_lon: f64,
    pub platform_hgt: f64,
    /// Unit vector from radar to observation, east component
    pub platform_dir1: f64,
    /// North component
    pub platform_dir2: f64,
    /// Up component
    pub platform_dir3: f64,
    pub platform_nyquist: f32,
}

impl ObservationRecord {
    /// Norm of the direction vector (1 for well-formed records).
    pub fn direction_norm(&self) -> f64 {
        (self.platform_dir1.powi(2) + self.platform_dir2.powi(2) + self.platform_dir3.powi(2))
            .sqrt()
    }
}

/// All observations of one kind from one or more volumes.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationTable {
    pub kind: FieldKind,
    pub records: Vec<ObservationRecord>,
}

impl ObservationTable {
    pub fn new(kind: FieldKind, records: Vec<ObservationRecord>) -> Self {
        Self { kind, records }
    }

    pub fn empty(kind: FieldKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append another table of the same kind.
    pub fn extend(&mut self, other: ObservationTable) {
        self.records.extend(other.records);
    }
}

/// Document-level provenance attached to a persisted store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub created: DateTime<Utc>,
    pub version: String,
    pub source_volume: Option<String>,
}

impl Provenance {
    pub fn new(created: DateTime<Utc>, source_volume: Option<String>) -> Self {
        Self {
            created,
            version: env!("CARGO_PKG_VERSION").to_string(),
            source_volume,
        }
    }

    /// Stamped with the current time.
    pub fn now(source_volume: Option<String>) -> Self {
        Self::new(Utc::now(), source_volume)
    }

    /// `Created YYYYmmdd_HHMM`
    pub fn history(&self) -> String {
        format!("Created {}", self.created.format("%Y%m%d_%H%M"))
    }
}
