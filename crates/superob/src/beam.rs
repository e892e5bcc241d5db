//! Radar beam geometry.
//!
//! Gate positions use the 4/3 effective earth radius model for standard
//! atmospheric refraction.

/// Mean earth radius (meters).
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Effective earth radius for standard refraction.
pub const EFFECTIVE_EARTH_RADIUS: f64 = EARTH_RADIUS * 4.0 / 3.0;

/// Planar position and height of a gate relative to the antenna.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatePosition {
    /// Meters east of the radar
    pub x: f64,
    /// Meters north of the radar
    pub y: f64,
    /// Meters above the antenna
    pub z: f64,
}

impl GatePosition {
    /// Horizontal distance from the radar.
    pub fn ground_range(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Position of the gate at `range` meters along a beam pointing at
/// `azimuth` (degrees clockwise from north) and `elevation` (degrees).
pub fn gate_position(azimuth_deg: f64, elevation_deg: f64, range: f64) -> GatePosition {
    let r_e = EFFECTIVE_EARTH_RADIUS;
    let el = elevation_deg.to_radians();
    let az = azimuth_deg.to_radians();

    let z = (range * range + r_e * r_e + 2.0 * range * r_e * el.sin()).sqrt() - r_e;
    let s = r_e * (range * el.cos() / (r_e + z)).asin();

    GatePosition {
        x: s * az.sin(),
        y: s * az.cos(),
        z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_range_is_antenna() {
        let p = gate_position(45.0, 0.5, 0.0);
        assert!(p.x.abs() < 1e-9 && p.y.abs() < 1e-9 && p.z.abs() < 1e-9);
    }

    #[test]
    fn test_azimuth_orientation() {
        let north = gate_position(0.0, 0.0, 50_000.0);
        assert!(north.x.abs() < 1e-6);
        assert!(north.y > 49_000.0);

        let east = gate_position(90.0, 0.0, 50_000.0);
        assert!(east.x > 49_000.0);
        assert!(east.y.abs() < 1e-6);
    }

    #[test]
    fn test_beam_rises_with_range() {
        // Flat beam still rises through earth curvature
        let near = gate_position(0.0, 0.0, 50_000.0);
        let far = gate_position(0.0, 0.0, 150_000.0);
        assert!(near.z > 100.0 && near.z < 200.0, "got {}", near.z);
        assert!(far.z > near.z);

        let tilted = gate_position(0.0, 10.0, 50_000.0);
        assert!(tilted.z > 8_000.0 && tilted.z < 9_000.0, "got {}", tilted.z);
    }
}
