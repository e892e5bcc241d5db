//! Gridded fields produced by the analysis kernel.

use chrono::{DateTime, Utc};
use ndarray::{Array2, Array3, Zip};
use radar_common::{FieldKind, RadarSite, MISSING};

use crate::error::{Result, SuperobError};

/// Synthetic layer of zero reflectivity marking clear air.
#[derive(Debug, Clone, PartialEq)]
pub struct ZeroEchoLayer {
    /// Layer values, 0 where valid and the sentinel elsewhere.
    pub data: Array2<f32>,
    /// True where the layer carries no observation.
    pub mask: Array2<bool>,
    /// Height of the layer above the radar (meters).
    pub height: f32,
    /// Column maximum of detectable echo used to place the layer.
    pub composite: Array2<f32>,
}

impl ZeroEchoLayer {
    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|m| !**m).count()
    }
}

/// Named inputs for [`GriddedField::new`].
#[derive(Debug, Clone)]
pub struct GriddedFieldParts {
    pub name: String,
    pub kind: FieldKind,
    pub units: String,
    /// Kernel output, indexed (sweep, y, x)
    pub analysis: Array3<f32>,
    /// Cells that passed the kernel's acceptance thresholds
    pub accepted: Array3<bool>,
    /// Gridded height above radar
    pub height: Array3<f32>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub lat: Array2<f64>,
    pub lon: Array2<f64>,
    pub radar_offset: (f64, f64),
    pub elevations: Vec<f32>,
    pub sweep_times: Vec<DateTime<Utc>>,
    pub nyquist: Vec<f32>,
    pub site: RadarSite,
    pub volume_time: DateTime<Utc>,
}

/// A 3-D gridded field with its mask and companion height field.
///
/// `analysis` and `accepted` hold the kernel output and never change.
/// `data` and `mask` start as a copy and are refined by the QC stage.
#[derive(Debug, Clone)]
pub struct GriddedField {
    pub name: String,
    pub kind: FieldKind,
    pub units: String,
    pub data: Array3<f32>,
    pub mask: Array3<bool>,
    pub height: Array3<f32>,
    pub analysis: Array3<f32>,
    pub accepted: Array3<bool>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub lat: Array2<f64>,
    pub lon: Array2<f64>,
    pub radar_offset: (f64, f64),
    pub elevations: Vec<f32>,
    pub sweep_times: Vec<DateTime<Utc>>,
    pub nyquist: Vec<f32>,
    pub site: RadarSite,
    pub volume_time: DateTime<Utc>,
    pub zero_layer: Option<ZeroEchoLayer>,
}

impl GriddedField {
    pub fn new(parts: GriddedFieldParts) -> Result<Self> {
        let shape = parts.analysis.shape().to_vec();
        if parts.accepted.shape() != shape.as_slice() {
            return Err(SuperobError::shape_mismatch(&shape, parts.accepted.shape()));
        }
        if parts.height.shape() != shape.as_slice() {
            return Err(SuperobError::shape_mismatch(&shape, parts.height.shape()));
        }
        let (nz, ny, nx) = (shape[0], shape[1], shape[2]);
        if parts.x.len() != nx || parts.y.len() != ny {
            return Err(SuperobError::shape_mismatch(
                &[ny, nx],
                &[parts.y.len(), parts.x.len()],
            ));
        }
        if parts.lat.shape() != [ny, nx] || parts.lon.shape() != [ny, nx] {
            return Err(SuperobError::shape_mismatch(&[ny, nx], parts.lat.shape()));
        }
        for per_sweep in [parts.elevations.len(), parts.nyquist.len(), parts.sweep_times.len()] {
            if per_sweep != nz {
                return Err(SuperobError::shape_mismatch(&[nz], &[per_sweep]));
            }
        }

        let mask = parts.accepted.mapv(|a| !a);
        let mut data = parts.analysis.clone();
        Zip::from(&mut data).and(&mask).for_each(|v, &m| {
            if m {
                *v = MISSING;
            }
        });

        Ok(Self {
            name: parts.name,
            kind: parts.kind,
            units: parts.units,
            data,
            mask,
            height: parts.height,
            analysis: parts.analysis,
            accepted: parts.accepted,
            x: parts.x,
            y: parts.y,
            lat: parts.lat,
            lon: parts.lon,
            radar_offset: parts.radar_offset,
            elevations: parts.elevations,
            sweep_times: parts.sweep_times,
            nyquist: parts.nyquist,
            site: parts.site,
            volume_time: parts.volume_time,
            zero_layer: None,
        })
    }

    /// (sweeps, ny, nx)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Number of unmasked cells across all sweeps.
    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|m| !**m).count()
    }

    pub fn level_valid_count(&self, k: usize) -> usize {
        self.mask
            .index_axis(ndarray::Axis(0), k)
            .iter()
            .filter(|m| !**m)
            .count()
    }

    /// Mask one cell and overwrite its value with the sentinel.
    pub fn set_masked(&mut self, idx: [usize; 3]) {
        self.mask[idx] = true;
        self.data[idx] = MISSING;
    }

    /// Overwrite every masked cell with the sentinel.
    pub fn apply_sentinel(&mut self) {
        Zip::from(&mut self.data).and(&self.mask).for_each(|v, &m| {
            if m {
                *v = MISSING;
            }
        });
    }

    /// Planar offset of grid column `i`, row `j` from the radar.
    pub fn offset_from_radar(&self, i: usize, j: usize) -> (f64, f64) {
        (self.x[i] - self.radar_offset.0, self.y[j] - self.radar_offset.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parts(nz: usize, ny: usize, nx: usize) -> GriddedFieldParts {
        let t = Utc.with_ymd_and_hms(2023, 5, 10, 21, 0, 0).unwrap();
        GriddedFieldParts {
            name: "reflectivity".to_string(),
            kind: FieldKind::Reflectivity,
            units: "dBZ".to_string(),
            analysis: Array3::from_elem((nz, ny, nx), 30.0),
            accepted: Array3::from_elem((nz, ny, nx), true),
            height: Array3::from_elem((nz, ny, nx), 1000.0),
            x: vec![0.0; nx],
            y: vec![0.0; ny],
            lat: Array2::zeros((ny, nx)),
            lon: Array2::zeros((ny, nx)),
            radar_offset: (0.0, 0.0),
            elevations: vec![0.5; nz],
            sweep_times: vec![t; nz],
            nyquist: vec![25.0; nz],
            site: RadarSite::new(35.0, -97.0, 370.0),
            volume_time: t,
        }
    }

    #[test]
    fn test_rejected_cells_carry_sentinel() {
        let mut p = parts(2, 3, 3);
        p.accepted[[1, 0, 0]] = false;
        let field = GriddedField::new(p).unwrap();
        assert!(field.mask[[1, 0, 0]]);
        assert_eq!(field.data[[1, 0, 0]], MISSING);
        assert_eq!(field.analysis[[1, 0, 0]], 30.0);
        assert_eq!(field.valid_count(), 17);
        assert_eq!(field.level_valid_count(0), 9);
    }

    #[test]
    fn test_shape_checked() {
        let mut p = parts(2, 3, 3);
        p.height = Array3::zeros((2, 3, 4));
        assert!(matches!(
            GriddedField::new(p),
            Err(SuperobError::ShapeMismatch { .. })
        ));

        let mut p = parts(2, 3, 3);
        p.nyquist = vec![25.0];
        assert!(GriddedField::new(p).is_err());
    }
}
