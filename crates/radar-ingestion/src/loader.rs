//! Volume loading.
//!
//! Binary Level-II decoding is done upstream. The loader here reads volumes
//! that have already been decoded into a JSON document, with `null` marking
//! a masked gate.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use radar_common::RadarSite;
use serde::{Deserialize, Serialize};
use superob::{RadarVolume, Sweep, SweepField};
use tracing::debug;

use crate::error::{IngestionError, Result};

/// Produces a decoded volume from an input file.
pub trait VolumeLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<RadarVolume>;
}

/// On-disk form of one sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepDocument {
    /// Degrees
    pub elevation: f32,
    /// m/s
    pub nyquist: f32,
    pub time: DateTime<Utc>,
    /// Degrees clockwise from north, one per ray
    pub azimuths: Vec<f32>,
    /// Meters to each gate centre
    pub ranges: Vec<f32>,
    /// Field name to rays × gates values
    pub fields: BTreeMap<String, Vec<Vec<Option<f32>>>>,
}

/// On-disk form of a decoded volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeDocument {
    pub instrument: String,
    pub site: RadarSite,
    pub time: DateTime<Utc>,
    pub sweeps: Vec<SweepDocument>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl VolumeDocument {
    pub fn from_volume(volume: &RadarVolume) -> Self {
        let sweeps = volume
            .sweeps
            .iter()
            .map(|sweep| SweepDocument {
                elevation: sweep.elevation,
                nyquist: sweep.nyquist,
                time: sweep.time,
                azimuths: sweep.azimuths.clone(),
                ranges: sweep.ranges.clone(),
                fields: sweep
                    .fields
                    .iter()
                    .map(|(name, field)| (name.clone(), field_rows(field)))
                    .collect(),
            })
            .collect();

        Self {
            instrument: volume.instrument.clone(),
            site: volume.site,
            time: volume.time,
            sweeps,
            metadata: volume.metadata.clone(),
        }
    }

    pub fn into_volume(self) -> superob::Result<RadarVolume> {
        let mut sweeps = Vec::with_capacity(self.sweeps.len());
        for doc in self.sweeps {
            let mut fields = BTreeMap::new();
            for (name, rows) in &doc.fields {
                fields.insert(name.clone(), SweepField::from_rows(rows)?);
            }
            sweeps.push(Sweep {
                elevation: doc.elevation,
                nyquist: doc.nyquist,
                time: doc.time,
                azimuths: doc.azimuths,
                ranges: doc.ranges,
                fields,
            });
        }

        let volume = RadarVolume {
            site: self.site,
            instrument: self.instrument,
            time: self.time,
            sweeps,
            metadata: self.metadata,
        };
        volume.validate()?;
        Ok(volume)
    }

    /// Write the document as JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)
            .map_err(|e| IngestionError::Other(anyhow::anyhow!("JSON encode failed: {}", e)))
    }
}

fn field_rows(field: &SweepField) -> Vec<Vec<Option<f32>>> {
    field
        .data
        .outer_iter()
        .zip(field.mask.outer_iter())
        .map(|(values, mask)| {
            values
                .iter()
                .zip(mask.iter())
                .map(|(v, m)| if *m { None } else { Some(*v) })
                .collect()
        })
        .collect()
}

/// Loads [`VolumeDocument`] JSON files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonVolumeLoader;

impl VolumeLoader for JsonVolumeLoader {
    fn load(&self, path: &Path) -> Result<RadarVolume> {
        let path_str = path.display().to_string();
        let file = File::open(path).map_err(|e| IngestionError::decode(&path_str, e.to_string()))?;
        let doc: VolumeDocument = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| IngestionError::decode(&path_str, e.to_string()))?;
        let volume = doc
            .into_volume()
            .map_err(|e| IngestionError::decode(&path_str, e.to_string()))?;

        debug!(
            path = %path_str,
            instrument = %volume.instrument,
            sweeps = volume.sweeps.len(),
            fields = ?volume.field_names(),
            "Loaded volume"
        );
        Ok(volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_gates_are_masked() {
        let json = r#"{
            "instrument": "KTLX",
            "site": {"lat": 35.333, "lon": -97.278, "alt": 370.0},
            "time": "2023-05-10T21:30:12Z",
            "sweeps": [{
                "elevation": 0.5,
                "nyquist": 26.5,
                "time": "2023-05-10T21:30:12Z",
                "azimuths": [0.0, 180.0],
                "ranges": [1000.0, 2000.0, 3000.0],
                "fields": {"reflectivity": [[10.0, null, 30.0], [null, null, 5.0]]}
            }]
        }"#;
        let doc: VolumeDocument = serde_json::from_str(json).unwrap();
        let volume = doc.into_volume().unwrap();

        let field = volume.sweeps[0].field("reflectivity").unwrap();
        assert_eq!(field.valid_count(), 3);
        assert!(field.mask[[0, 1]]);
        assert_eq!(field.data[[0, 2]], 30.0);
        assert!(volume.metadata.is_empty());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let json = r#"{
            "instrument": "KTLX",
            "site": {"lat": 35.0, "lon": -97.0, "alt": 0.0},
            "time": "2023-05-10T21:30:12Z",
            "sweeps": [{
                "elevation": 0.5, "nyquist": 26.5, "time": "2023-05-10T21:30:12Z",
                "azimuths": [0.0, 180.0], "ranges": [1000.0, 2000.0],
                "fields": {"velocity": [[1.0, 2.0], [3.0]]}
            }]
        }"#;
        let doc: VolumeDocument = serde_json::from_str(json).unwrap();
        assert!(doc.into_volume().is_err());
    }
}
