//! Synthetic radar data generators.
//!
//! These generators create predictable sweeps, volumes and gridded fields so
//! tests can reason about exact outputs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ndarray::{Array2, Array3};
use radar_common::{FieldKind, RadarSite, MISSING};
use superob::{gate_position, GriddedField, GriddedFieldParts, RadarVolume, Sweep, SweepField};

/// Creates a sweep with evenly spaced rays and gates and no fields.
///
/// Azimuths start at 0 and step by `360 / n_rays`; gate centres sit at
/// `(k + 0.5) * gate_spacing`.
pub fn empty_sweep(
    elevation: f32,
    n_rays: usize,
    n_gates: usize,
    gate_spacing: f32,
    time: DateTime<Utc>,
) -> Sweep {
    let step = 360.0 / n_rays.max(1) as f32;
    Sweep {
        elevation,
        nyquist: 25.0,
        time,
        azimuths: (0..n_rays).map(|r| r as f32 * step).collect(),
        ranges: (0..n_gates)
            .map(|k| (k as f32 + 0.5) * gate_spacing)
            .collect(),
        fields: BTreeMap::new(),
    }
}

/// Creates a field with the same value at every gate.
pub fn uniform_field(n_rays: usize, n_gates: usize, value: f32) -> SweepField {
    SweepField::unmasked(Array2::from_elem((n_rays, n_gates), value))
}

/// Creates a field with every gate masked.
pub fn masked_field(n_rays: usize, n_gates: usize) -> SweepField {
    SweepField {
        data: Array2::from_elem((n_rays, n_gates), 0.0),
        mask: Array2::from_elem((n_rays, n_gates), true),
    }
}

/// Reflectivity with a circular storm of `peak` dBZ centred `center` meters
/// from the radar, falling linearly to `background` at `radius`.
pub fn storm_reflectivity(
    sweep: &Sweep,
    center: (f64, f64),
    radius: f64,
    peak: f32,
    background: f32,
) -> SweepField {
    let data = Array2::from_shape_fn((sweep.n_rays(), sweep.n_gates()), |(ray, gate)| {
        let pos = gate_position(
            f64::from(sweep.azimuths[ray]),
            f64::from(sweep.elevation),
            f64::from(sweep.ranges[gate]),
        );
        let d = (pos.x - center.0).hypot(pos.y - center.1);
        if d >= radius {
            background
        } else {
            let frac = (1.0 - d / radius) as f32;
            background + (peak - background) * frac
        }
    });
    SweepField::unmasked(data)
}

/// Radial component of a uniform wind `(u, v)` in m/s.
pub fn uniform_wind_velocity(sweep: &Sweep, u: f32, v: f32) -> SweepField {
    let cos_el = sweep.elevation.to_radians().cos();
    let data = Array2::from_shape_fn((sweep.n_rays(), sweep.n_gates()), |(ray, _)| {
        let az = sweep.azimuths[ray].to_radians();
        (u * az.sin() + v * az.cos()) * cos_el
    });
    SweepField::unmasked(data)
}

/// Creates a volume with a storm north-east of the radar and a uniform
/// south-westerly wind on every sweep.
///
/// Fields: `reflectivity`, `velocity`.
pub fn synthetic_volume(
    site: RadarSite,
    time: DateTime<Utc>,
    elevations: &[f32],
    n_rays: usize,
    n_gates: usize,
    gate_spacing: f32,
) -> RadarVolume {
    let sweeps = elevations
        .iter()
        .enumerate()
        .map(|(k, &el)| {
            let mut sweep = empty_sweep(
                el,
                n_rays,
                n_gates,
                gate_spacing,
                time + chrono::Duration::seconds(20 * k as i64),
            );
            let dbz = storm_reflectivity(&sweep, (12_000.0, 12_000.0), 8_000.0, 50.0, 5.0);
            let vel = uniform_wind_velocity(&sweep, 10.0, 10.0);
            sweep.fields.insert("reflectivity".to_string(), dbz);
            sweep.fields.insert("velocity".to_string(), vel);
            sweep
        })
        .collect();

    RadarVolume {
        site,
        instrument: "KTLX".to_string(),
        time,
        sweeps,
        metadata: BTreeMap::new(),
    }
}

/// Creates a one-sweep volume holding a single valid gate.
pub fn single_gate_volume(
    site: RadarSite,
    time: DateTime<Utc>,
    azimuth: f32,
    range: f32,
    field: &str,
    value: f32,
) -> RadarVolume {
    let mut sweep = Sweep {
        elevation: 0.0,
        nyquist: 25.0,
        time,
        azimuths: vec![azimuth],
        ranges: vec![range],
        fields: BTreeMap::new(),
    };
    sweep
        .fields
        .insert(field.to_string(), uniform_field(1, 1, value));

    RadarVolume {
        site,
        instrument: "TEST".to_string(),
        time,
        sweeps: vec![sweep],
        metadata: BTreeMap::new(),
    }
}

/// Creates a gridded field from analysis values. Cells holding the sentinel
/// count as rejected by the kernel. Grid axes are spaced 3 km starting at
/// zero, with height 1 km everywhere.
pub fn gridded_field(
    kind: FieldKind,
    analysis: Array3<f32>,
    site: RadarSite,
    time: DateTime<Utc>,
) -> GriddedField {
    let (nz, ny, nx) = analysis.dim();
    let lat = Array2::from_shape_fn((ny, nx), |(j, _)| site.lat + j as f64 * 0.027);
    let lon = Array2::from_shape_fn((ny, nx), |(_, i)| site.lon + i as f64 * 0.033);
    GriddedField::new(GriddedFieldParts {
        name: kind.as_str().to_string(),
        kind,
        units: kind.units().to_string(),
        accepted: analysis.mapv(|v| v > MISSING),
        analysis,
        height: Array3::from_elem((nz, ny, nx), 1000.0),
        x: (0..nx).map(|i| i as f64 * 3000.0).collect(),
        y: (0..ny).map(|j| j as f64 * 3000.0).collect(),
        lat,
        lon,
        radar_offset: (0.0, 0.0),
        elevations: (0..nz).map(|k| 0.5 + k as f32).collect(),
        sweep_times: vec![time; nz],
        nyquist: vec![25.0; nz],
        site,
        volume_time: time,
    })
    .unwrap()
}
