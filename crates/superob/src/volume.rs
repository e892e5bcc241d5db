//! Decoded radar volumes.
//!
//! A volume is produced by an external decoder and consumed read-only by the
//! analysis kernel. Field arrays are laid out rays × gates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ndarray::Array2;
use radar_common::RadarSite;

use crate::beam::{gate_position, GatePosition};
use crate::error::{Result, SuperobError};

/// Per-gate values of one field in one sweep. `mask` is true where the gate
/// carries no valid observation.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepField {
    pub data: Array2<f32>,
    pub mask: Array2<bool>,
}

impl SweepField {
    pub fn new(data: Array2<f32>, mask: Array2<bool>) -> Result<Self> {
        if data.shape() != mask.shape() {
            return Err(SuperobError::shape_mismatch(data.shape(), mask.shape()));
        }
        Ok(Self { data, mask })
    }

    /// Field with no masked gates.
    pub fn unmasked(data: Array2<f32>) -> Self {
        let mask = Array2::from_elem(data.raw_dim(), false);
        Self { data, mask }
    }

    /// Build from nested rows where `None` marks a masked gate.
    pub fn from_rows(rows: &[Vec<Option<f32>>]) -> Result<Self> {
        let n_rays = rows.len();
        let n_gates = rows.first().map(|r| r.len()).unwrap_or(0);

        let mut data = Array2::from_elem((n_rays, n_gates), 0.0_f32);
        let mut mask = Array2::from_elem((n_rays, n_gates), true);

        for (ray, row) in rows.iter().enumerate() {
            if row.len() != n_gates {
                return Err(SuperobError::shape_mismatch(&[n_rays, n_gates], &[ray, row.len()]));
            }
            for (gate, value) in row.iter().enumerate() {
                if let Some(v) = value {
                    data[[ray, gate]] = *v;
                    mask[[ray, gate]] = false;
                }
            }
        }

        Ok(Self { data, mask })
    }

    /// True when the gate holds a usable value.
    pub fn is_valid(&self, ray: usize, gate: usize) -> bool {
        !self.mask[[ray, gate]] && self.data[[ray, gate]].is_finite()
    }

    pub fn valid_count(&self) -> usize {
        self.data
            .iter()
            .zip(self.mask.iter())
            .filter(|(v, m)| !**m && v.is_finite())
            .count()
    }
}

/// One full rotation at a fixed elevation.
#[derive(Debug, Clone)]
pub struct Sweep {
    /// Elevation angle (degrees)
    pub elevation: f32,
    /// Nyquist velocity (m/s)
    pub nyquist: f32,
    /// Mean time of the sweep
    pub time: DateTime<Utc>,
    /// Azimuth per ray (degrees clockwise from north)
    pub azimuths: Vec<f32>,
    /// Range to each gate centre (meters)
    pub ranges: Vec<f32>,
    pub fields: BTreeMap<String, SweepField>,
}

impl Sweep {
    pub fn n_rays(&self) -> usize {
        self.azimuths.len()
    }

    pub fn n_gates(&self) -> usize {
        self.ranges.len()
    }

    pub fn field(&self, name: &str) -> Option<&SweepField> {
        self.fields.get(name)
    }

    /// Position of a gate relative to the antenna.
    pub fn gate_position(&self, ray: usize, gate: usize) -> GatePosition {
        gate_position(
            f64::from(self.azimuths[ray]),
            f64::from(self.elevation),
            f64::from(self.ranges[gate]),
        )
    }

    /// Check that every field matches the rays × gates layout.
    pub fn validate(&self) -> Result<()> {
        for (name, field) in &self.fields {
            self.check_layout(name, field)?;
        }
        Ok(())
    }

    /// Data and mask of `field` must both be rays × gates.
    pub fn check_layout(&self, name: &str, field: &SweepField) -> Result<()> {
        let expected = [self.n_rays(), self.n_gates()];
        for (what, shape) in [("data", field.data.shape()), ("mask", field.mask.shape())] {
            if shape != expected {
                return Err(SuperobError::invalid_volume(format!(
                    "field '{}' {} has shape {:?}, sweep layout is {:?}",
                    name, what, shape, expected
                )));
            }
        }
        Ok(())
    }
}

/// A complete radar volume scan.
#[derive(Debug, Clone)]
pub struct RadarVolume {
    pub site: RadarSite,
    /// Instrument name, e.g. `KTLX`
    pub instrument: String,
    /// Volume start time
    pub time: DateTime<Utc>,
    pub sweeps: Vec<Sweep>,
    pub metadata: BTreeMap<String, String>,
}

impl RadarVolume {
    pub fn has_field(&self, name: &str) -> bool {
        self.sweeps.iter().any(|s| s.fields.contains_key(name))
    }

    /// Field names present in any sweep.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .sweeps
            .iter()
            .flat_map(|s| s.fields.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Mean of the sweep times, or the volume time if there are no sweeps.
    pub fn mean_time(&self) -> DateTime<Utc> {
        if self.sweeps.is_empty() {
            return self.time;
        }
        let base = self.sweeps[0].time;
        let total_ms: i64 = self
            .sweeps
            .iter()
            .map(|s| (s.time - base).num_milliseconds())
            .sum();
        base + chrono::Duration::milliseconds(total_ms / self.sweeps.len() as i64)
    }

    /// Insert or replace a field in every sweep.
    ///
    /// Nothing is inserted unless every sweep field matches its layout.
    pub fn set_field(&mut self, name: &str, per_sweep: Vec<SweepField>) -> Result<()> {
        if per_sweep.len() != self.sweeps.len() {
            return Err(SuperobError::invalid_volume(format!(
                "field '{}' has {} sweeps, volume has {}",
                name,
                per_sweep.len(),
                self.sweeps.len()
            )));
        }
        for (sweep, field) in self.sweeps.iter().zip(&per_sweep) {
            sweep.check_layout(name, field)?;
        }
        for (sweep, field) in self.sweeps.iter_mut().zip(per_sweep) {
            sweep.fields.insert(name.to_string(), field);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for sweep in &self.sweeps {
            sweep.validate()?;
        }
        Ok(())
    }
}
