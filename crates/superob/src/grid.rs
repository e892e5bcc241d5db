//! Analysis grid construction.
//!
//! A grid is either centred on the radar (square, `1 + 2·floor(R/dx)` points
//! per side) or on an external reference point with a fixed extent. In the
//! second case the radar sits at a planar offset that the kernel adds to every
//! gate position.

use ndarray::Array2;
use projection::LambertConformal;
use radar_common::{GeoPoint, RadarSite};
use tracing::debug;

use crate::config::AnalysisGridSpec;
use crate::error::{Result, SuperobError};

/// Target horizontal grid with its projection.
#[derive(Debug, Clone)]
pub struct AnalysisGrid {
    /// Column coordinates (meters east of the origin)
    pub x: Vec<f64>,
    /// Row coordinates (meters north of the origin)
    pub y: Vec<f64>,
    /// Latitude of every grid point, (ny, nx)
    pub lat: Array2<f64>,
    /// Longitude of every grid point, (ny, nx)
    pub lon: Array2<f64>,
    pub projection: LambertConformal,
    /// Projection origin
    pub origin: GeoPoint,
    /// Planar position of the radar within the grid
    pub radar_offset: (f64, f64),
    pub spacing: f64,
}

impl AnalysisGrid {
    /// Build the grid for a radar site.
    pub fn new(spec: &AnalysisGridSpec, radar: &RadarSite) -> Result<Self> {
        spec.validate().map_err(SuperobError::invalid_grid_spec)?;

        let dx = spec.grid_spacing;
        let [latin1, latin2] = spec.standard_parallels;

        let (origin, nx, ny) = match &spec.reference {
            None => {
                let n = 1 + 2 * (spec.domain_radius / dx).floor() as usize;
                (radar.location(), n, n)
            }
            Some(reference) => {
                let nx = 1 + (reference.extent_x / dx).floor() as usize;
                let ny = 1 + (reference.extent_y / dx).floor() as usize;
                (reference.center, nx, ny)
            }
        };

        if nx <= 1 || ny <= 1 {
            return Err(SuperobError::invalid_grid_spec(format!(
                "grid has {} x {} points, need more than one per side",
                nx, ny
            )));
        }

        let projection = LambertConformal::centered_at(origin, latin1, latin2)?;

        let radar_offset = if spec.reference.is_some() {
            projection.forward(radar.lat, radar.lon)
        } else {
            (0.0, 0.0)
        };

        let x = symmetric_axis(nx, dx);
        let y = symmetric_axis(ny, dx);

        let mut lat = Array2::zeros((ny, nx));
        let mut lon = Array2::zeros((ny, nx));
        for (j, &yj) in y.iter().enumerate() {
            for (i, &xi) in x.iter().enumerate() {
                let (la, lo) = projection.inverse(xi, yj);
                lat[[j, i]] = la;
                lon[[j, i]] = lo;
            }
        }

        debug!(
            nx = nx,
            ny = ny,
            spacing = dx,
            origin_lat = origin.lat,
            origin_lon = origin.lon,
            radar_x = radar_offset.0,
            radar_y = radar_offset.1,
            "Built analysis grid"
        );

        Ok(Self {
            x,
            y,
            lat,
            lon,
            projection,
            origin,
            radar_offset,
            spacing: dx,
        })
    }

    /// (ny, nx)
    pub fn shape(&self) -> (usize, usize) {
        (self.y.len(), self.x.len())
    }

    pub fn radar_offset(&self) -> (f64, f64) {
        self.radar_offset
    }

    /// Horizontal distance from the radar to grid point (i, j).
    pub fn range_from_radar(&self, i: usize, j: usize) -> f64 {
        (self.x[i] - self.radar_offset.0).hypot(self.y[j] - self.radar_offset.1)
    }
}

/// `n` points spaced `dx` apart, centred on zero.
fn symmetric_axis(n: usize, dx: f64) -> Vec<f64> {
    let half = (n as f64 - 1.0) / 2.0;
    (0..n).map(|k| (k as f64 - half) * dx).collect()
}
