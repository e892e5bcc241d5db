//! Objective analysis of radar gates onto the analysis grid.
//!
//! For each sweep the valid gates of one field are placed on the grid plane
//! and every grid point takes the weighted mean of the gates within the
//! search radius. A grid point is kept only when enough gates contribute
//! (`min_count`) with enough total weight (`min_weight`). Gate heights are
//! averaged with the same weights so the height field shares the acceptance
//! mask.
//!
//! Candidates are bounded with two binary searches: gates are sorted by x
//! once per sweep, each grid column takes the strip within the search radius
//! and sorts it by y, and each grid row searches that strip. The result is
//! the same as testing every gate against every grid point.

use ndarray::{Array2, Array3, Axis};
use radar_common::{FieldKind, MISSING};
use tracing::{info, warn};

use crate::config::AnalysisGridSpec;
use crate::error::{Result, SuperobError};
use crate::field::{GriddedField, GriddedFieldParts};
use crate::grid::AnalysisGrid;
use crate::volume::{RadarVolume, Sweep};

/// A gate on the grid plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarGate {
    pub x: f64,
    pub y: f64,
    /// Height above the radar, clamped at zero
    pub height: f64,
    pub value: f64,
}

/// Running sums for one grid point.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: usize,
    weight: f64,
    weighted_value: f64,
    weighted_height: f64,
}

impl Accumulator {
    fn add(&mut self, w: f64, gate: &PlanarGate) {
        self.count += 1;
        self.weight += w;
        self.weighted_value += w * gate.value;
        self.weighted_height += w * gate.height;
    }
}

/// Gridded value, height and acceptance for one sweep.
#[derive(Debug, Clone)]
pub struct LevelAnalysis {
    pub value: Array2<f32>,
    pub height: Array2<f32>,
    pub accepted: Array2<bool>,
}

impl LevelAnalysis {
    fn rejected(ny: usize, nx: usize) -> Self {
        Self {
            value: Array2::from_elem((ny, nx), MISSING),
            height: Array2::from_elem((ny, nx), MISSING),
            accepted: Array2::from_elem((ny, nx), false),
        }
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.iter().filter(|a| **a).count()
    }
}

/// Analysis kernel bound to one grid.
pub struct ObjectiveAnalysis<'a> {
    spec: &'a AnalysisGridSpec,
    grid: &'a AnalysisGrid,
    search_radius: f64,
}

impl<'a> ObjectiveAnalysis<'a> {
    pub fn new(spec: &'a AnalysisGridSpec, grid: &'a AnalysisGrid) -> Self {
        Self {
            spec,
            grid,
            search_radius: spec.search_radius(),
        }
    }

    pub fn search_radius(&self) -> f64 {
        self.search_radius
    }

    /// Grid one field of a volume, one level per sweep.
    ///
    /// Sweeps without the field or without valid gates produce fully masked
    /// levels. Fails only when no sweep carries the field at all.
    pub fn grid_field(
        &self,
        volume: &RadarVolume,
        field_name: &str,
        kind: FieldKind,
    ) -> Result<GriddedField> {
        if !volume.has_field(field_name) {
            return Err(SuperobError::MissingField(field_name.to_string()));
        }

        let (ny, nx) = self.grid.shape();
        let nz = volume.sweeps.len();

        let mut analysis = Array3::from_elem((nz, ny, nx), MISSING);
        let mut height = Array3::from_elem((nz, ny, nx), MISSING);
        let mut accepted = Array3::from_elem((nz, ny, nx), false);

        for (k, sweep) in volume.sweeps.iter().enumerate() {
            sweep.validate()?;

            let gates = self.planar_gates(sweep, field_name);
            if gates.is_empty() {
                warn!(
                    field = %field_name,
                    sweep = k,
                    elevation = sweep.elevation,
                    "No valid gates in sweep, level fully masked"
                );
                continue;
            }

            let level = self.analyse_gates(&gates);
            info!(
                field = %field_name,
                sweep = k,
                elevation = sweep.elevation,
                gates = gates.len(),
                valid = level.accepted_count(),
                "Gridded sweep"
            );

            analysis.index_axis_mut(Axis(0), k).assign(&level.value);
            height.index_axis_mut(Axis(0), k).assign(&level.height);
            accepted.index_axis_mut(Axis(0), k).assign(&level.accepted);
        }

        let units = kind.units().to_string();
        let field = GriddedField::new(GriddedFieldParts {
            name: field_name.to_string(),
            kind,
            units,
            analysis,
            accepted,
            height,
            x: self.grid.x.clone(),
            y: self.grid.y.clone(),
            lat: self.grid.lat.clone(),
            lon: self.grid.lon.clone(),
            radar_offset: self.grid.radar_offset,
            elevations: volume.sweeps.iter().map(|s| s.elevation).collect(),
            sweep_times: volume.sweeps.iter().map(|s| s.time).collect(),
            nyquist: volume.sweeps.iter().map(|s| s.nyquist).collect(),
            site: volume.site,
            volume_time: volume.mean_time(),
        })?;

        info!(
            field = %field_name,
            sweeps = nz,
            valid = field.valid_count(),
            "Gridded field"
        );
        Ok(field)
    }

    /// Valid gates of one sweep inside the range window, offset into the
    /// grid plane.
    pub fn planar_gates(&self, sweep: &Sweep, field_name: &str) -> Vec<PlanarGate> {
        let Some(field) = sweep.field(field_name) else {
            return Vec::new();
        };
        let (ox, oy) = self.grid.radar_offset;

        let mut gates = Vec::with_capacity(field.valid_count());
        for ray in 0..sweep.n_rays() {
            for gate in 0..sweep.n_gates() {
                if !field.is_valid(ray, gate) {
                    continue;
                }
                let pos = sweep.gate_position(ray, gate);
                let range = pos.ground_range();
                if range < self.spec.min_range || range > self.spec.max_range {
                    continue;
                }
                gates.push(PlanarGate {
                    x: pos.x + ox,
                    y: pos.y + oy,
                    height: pos.z.max(0.0),
                    value: f64::from(field.data[[ray, gate]]),
                });
            }
        }
        gates
    }

    /// Analyse gates already on the grid plane using the sorted search.
    pub fn analyse_gates(&self, gates: &[PlanarGate]) -> LevelAnalysis {
        let (ny, nx) = self.grid.shape();
        let mut level = LevelAnalysis::rejected(ny, nx);
        if gates.is_empty() {
            return level;
        }

        let r = self.search_radius;
        let mut by_x: Vec<PlanarGate> = gates.to_vec();
        by_x.sort_by(|a, b| a.x.total_cmp(&b.x));

        let mut strip: Vec<PlanarGate> = Vec::new();
        for (i, &xg) in self.grid.x.iter().enumerate() {
            let lo = by_x.partition_point(|g| g.x < xg - r);
            let hi = by_x.partition_point(|g| g.x <= xg + r);
            if lo >= hi {
                continue;
            }

            strip.clear();
            strip.extend_from_slice(&by_x[lo..hi]);
            strip.sort_by(|a, b| a.y.total_cmp(&b.y));

            for (j, &yg) in self.grid.y.iter().enumerate() {
                let lo = strip.partition_point(|g| g.y < yg - r);
                let hi = strip.partition_point(|g| g.y <= yg + r);

                let mut acc = Accumulator::default();
                for gate in &strip[lo..hi] {
                    self.accumulate(&mut acc, xg, yg, gate);
                }
                self.finish(&mut level, j, i, &acc);
            }
        }

        level
    }

    /// Analyse gates by testing every gate against every grid point.
    pub fn analyse_gates_brute_force(&self, gates: &[PlanarGate]) -> LevelAnalysis {
        let (ny, nx) = self.grid.shape();
        let mut level = LevelAnalysis::rejected(ny, nx);

        for (j, &yg) in self.grid.y.iter().enumerate() {
            for (i, &xg) in self.grid.x.iter().enumerate() {
                let mut acc = Accumulator::default();
                for gate in gates {
                    self.accumulate(&mut acc, xg, yg, gate);
                }
                self.finish(&mut level, j, i, &acc);
            }
        }

        level
    }

    fn accumulate(&self, acc: &mut Accumulator, xg: f64, yg: f64, gate: &PlanarGate) {
        let d = (gate.x - xg).hypot(gate.y - yg);
        if d > self.search_radius {
            return;
        }
        let w = self.spec.method.weight(d, self.spec.roi);
        if w > 0.0 {
            acc.add(w, gate);
        }
    }

    fn finish(&self, level: &mut LevelAnalysis, j: usize, i: usize, acc: &Accumulator) {
        if acc.count < self.spec.min_count
            || acc.weight <= 0.0
            || acc.weight < self.spec.min_weight
        {
            return;
        }
        level.value[[j, i]] = (acc.weighted_value / acc.weight) as f32;
        level.height[[j, i]] = (acc.weighted_height / acc.weight) as f32;
        level.accepted[[j, i]] = true;
    }
}
