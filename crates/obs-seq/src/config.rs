//! Serialization configuration.

use radar_common::FieldKind;
use serde::{Deserialize, Serialize};

/// Observation error standard deviations per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObsErrorTable {
    /// dBZ
    pub reflectivity: f32,
    /// dBZ
    #[serde(rename = "0reflectivity", alias = "zero_reflectivity")]
    pub zero_reflectivity: f32,
    /// m/s
    pub velocity: f32,
}

impl Default for ObsErrorTable {
    fn default() -> Self {
        Self {
            reflectivity: 5.0,
            zero_reflectivity: 5.0,
            velocity: 3.0,
        }
    }
}

impl ObsErrorTable {
    /// Standard deviation for a field kind.
    pub fn sigma(&self, kind: FieldKind) -> f32 {
        match kind {
            FieldKind::Reflectivity => self.reflectivity,
            FieldKind::ZeroReflectivity => self.zero_reflectivity,
            FieldKind::Velocity => self.velocity,
        }
    }

    /// Error variance for a field kind.
    pub fn variance(&self, kind: FieldKind) -> f32 {
        let s = self.sigma(kind);
        s * s
    }
}

/// Configuration for the serializer and table writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationConfig {
    pub errors: ObsErrorTable,

    /// Rows per Zarr chunk.
    pub chunk_size: usize,
}

impl Default for SerializationConfig {
    fn default() -> Self {
        Self {
            errors: ObsErrorTable::default(),
            chunk_size: 65_536,
        }
    }
}

impl SerializationConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        for kind in FieldKind::all() {
            let s = self.errors.sigma(*kind);
            if !(s.is_finite() && s > 0.0) {
                return Err(format!("observation error for {} must be > 0", kind));
            }
        }
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variance() {
        let errors = ObsErrorTable::default();
        assert_eq!(errors.variance(FieldKind::Reflectivity), 25.0);
        assert_eq!(errors.variance(FieldKind::Velocity), 9.0);
    }

    #[test]
    fn test_zero_error_rejected() {
        let mut config = SerializationConfig::default();
        assert!(config.validate().is_ok());
        config.errors.velocity = 0.0;
        assert!(config.validate().is_err());
    }
}
