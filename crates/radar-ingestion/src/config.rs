//! Processing configuration.
//!
//! Every stage takes its own immutable configuration value; the binary
//! composes them into [`RadarPrepConfig`].

use std::path::PathBuf;

use obs_seq::SerializationConfig;
use serde::{Deserialize, Serialize};
use superob::{AnalysisGridSpec, QcConfig};

use crate::dealias::DealiasMethod;

/// Orchestration settings for one batch of volumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Velocity unfolding; `None` grids the raw velocity.
    pub unfold: Option<DealiasMethod>,

    pub reflectivity_field: String,
    pub velocity_field: String,

    /// Files smaller than this are assumed to hold no usable volume (bytes).
    pub min_file_size: u64,

    /// Minutes before the analysis time searched for a volume.
    pub window_before_minutes: i64,
    /// Minutes after the analysis time searched for a volume.
    pub window_after_minutes: i64,

    /// Worker threads for the batch; `None` uses the rayon default.
    pub threads: Option<usize>,

    pub output_dir: PathBuf,

    /// Write only the velocity table.
    pub only_velocity: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            unfold: Some(DealiasMethod::Region),
            reflectivity_field: "reflectivity".to_string(),
            velocity_field: "velocity".to_string(),
            min_file_size: 2_048_000,
            window_before_minutes: 10,
            window_after_minutes: 10,
            threads: None,
            output_dir: PathBuf::from("opaws_files"),
            only_velocity: false,
        }
    }
}

impl ProcessingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.reflectivity_field.is_empty() || self.velocity_field.is_empty() {
            return Err("field names must not be empty".to_string());
        }
        if self.window_before_minutes < 0 || self.window_after_minutes < 0 {
            return Err("window minutes must be >= 0".to_string());
        }
        if self.threads == Some(0) {
            return Err("threads must be > 0".to_string());
        }
        Ok(())
    }
}

/// Complete configuration of a processing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarPrepConfig {
    pub grid: AnalysisGridSpec,
    pub qc: QcConfig,
    pub serialization: SerializationConfig,
    pub processing: ProcessingConfig,
}

impl RadarPrepConfig {
    /// Validate every section, prefixing errors with the section name.
    pub fn validate(&self) -> Result<(), String> {
        self.grid.validate().map_err(|e| format!("grid: {}", e))?;
        self.qc.validate().map_err(|e| format!("qc: {}", e))?;
        self.serialization
            .validate()
            .map_err(|e| format!("serialization: {}", e))?;
        self.processing
            .validate()
            .map_err(|e| format!("processing: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(RadarPrepConfig::default().validate().is_ok());
    }

    #[test]
    fn test_section_named_in_error() {
        let mut config = RadarPrepConfig::default();
        config.processing.threads = Some(0);
        let err = config.validate().unwrap_err();
        assert!(err.starts_with("processing:"), "{}", err);
    }
}
