//! Observation field kinds and the missing-value sentinel.

use serde::{Deserialize, Serialize};

/// Sentinel written into gridded cells that carry no physical value.
pub const MISSING: f32 = -99999.0;

/// Returns true when `value` is the sentinel or not a finite number.
pub fn is_missing(value: f32) -> bool {
    !value.is_finite() || value <= MISSING
}

/// Kind of radar observation carried by a gridded field or record table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Radar reflectivity factor (dBZ)
    Reflectivity,
    /// Doppler radial velocity (m/s)
    Velocity,
    /// Synthetic clear-air layer of zero reflectivity
    #[serde(rename = "0reflectivity")]
    ZeroReflectivity,
}

impl FieldKind {
    /// Name used for output groups and error-table lookups.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reflectivity => "reflectivity",
            Self::Velocity => "velocity",
            Self::ZeroReflectivity => "0reflectivity",
        }
    }

    /// Physical units of the observed value.
    pub fn units(&self) -> &'static str {
        match self {
            Self::Reflectivity | Self::ZeroReflectivity => "dBZ",
            Self::Velocity => "m/s",
        }
    }

    /// Parse from a field or group name (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "reflectivity" | "dbz" | "ref" => Some(Self::Reflectivity),
            "velocity" | "vr" | "vel" => Some(Self::Velocity),
            "0reflectivity" | "zero_reflectivity" | "0dbz" => Some(Self::ZeroReflectivity),
            _ => None,
        }
    }

    pub fn all() -> &'static [FieldKind] {
        &[Self::Reflectivity, Self::Velocity, Self::ZeroReflectivity]
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
