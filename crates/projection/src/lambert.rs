//! Lambert Conformal Conic projection.
//!
//! Ellipsoidal form (Snyder, "Map Projections: A Working Manual", §15) with
//! two standard parallels. Planar coordinates are meters east (x) and north
//! (y) of the projection origin, so the origin itself maps to (0, 0).
//!
//! The projection parameters include:
//! - Origin latitude/longitude: the grid centre (radar or reference point)
//! - Standard parallel(s): latin1 and latin2 (can be equal for tangent cone)
//! - Ellipsoid: WGS84 unless specified

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use radar_common::GeoPoint;

use crate::error::{ProjectionError, Result};

const MAX_INVERSE_ITERATIONS: usize = 15;
const INVERSE_TOLERANCE: f64 = 1.0e-12;

/// Reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis (meters)
    pub a: f64,
    /// Flattening
    pub f: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        f: 1.0 / 298.257_223_563,
    };

    /// First eccentricity.
    pub fn eccentricity(&self) -> f64 {
        (2.0 * self.f - self.f * self.f).sqrt()
    }
}

/// Lambert Conformal Conic projection centred on an origin point.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Origin latitude in radians
    pub lat0: f64,
    /// Central meridian in radians
    pub lon0: f64,
    /// First standard parallel in radians
    pub latin1: f64,
    /// Second standard parallel in radians
    pub latin2: f64,
    ellipsoid: Ellipsoid,
    e: f64,
    /// Cone constant
    n: f64,
    /// a·F
    af: f64,
    /// Rho at the origin latitude
    rho0: f64,
}

impl LambertConformal {
    /// Create a projection on the WGS84 ellipsoid.
    ///
    /// # Arguments
    /// * `lat0_deg` - Origin latitude (degrees)
    /// * `lon0_deg` - Origin longitude / central meridian (degrees)
    /// * `latin1_deg` - First standard parallel (degrees)
    /// * `latin2_deg` - Second standard parallel (degrees)
    pub fn new(lat0_deg: f64, lon0_deg: f64, latin1_deg: f64, latin2_deg: f64) -> Result<Self> {
        Self::with_ellipsoid(lat0_deg, lon0_deg, latin1_deg, latin2_deg, Ellipsoid::WGS84)
    }

    /// Create a projection centred on `origin`.
    pub fn centered_at(origin: GeoPoint, latin1_deg: f64, latin2_deg: f64) -> Result<Self> {
        Self::new(origin.lat, origin.lon, latin1_deg, latin2_deg)
    }

    pub fn with_ellipsoid(
        lat0_deg: f64,
        lon0_deg: f64,
        latin1_deg: f64,
        latin2_deg: f64,
        ellipsoid: Ellipsoid,
    ) -> Result<Self> {
        if !lat0_deg.is_finite() || !lon0_deg.is_finite() || lat0_deg.abs() >= 90.0 {
            return Err(ProjectionError::InvalidOrigin {
                lat: lat0_deg,
                lon: lon0_deg,
            });
        }

        let bad_parallels = |reason: &str| ProjectionError::InvalidParallels {
            latin1: latin1_deg,
            latin2: latin2_deg,
            reason: reason.to_string(),
        };

        if !latin1_deg.is_finite()
            || !latin2_deg.is_finite()
            || latin1_deg.abs() >= 90.0
            || latin2_deg.abs() >= 90.0
        {
            return Err(bad_parallels("parallels must lie strictly between the poles"));
        }

        let to_rad = PI / 180.0;
        let lat0 = lat0_deg * to_rad;
        let lon0 = lon0_deg * to_rad;
        let latin1 = latin1_deg * to_rad;
        let latin2 = latin2_deg * to_rad;
        let e = ellipsoid.eccentricity();

        let m1 = m_factor(latin1, e);
        let t1 = t_factor(latin1, e);

        let n = if (latin1 - latin2).abs() < 1e-10 {
            // Tangent cone
            latin1.sin()
        } else {
            let m2 = m_factor(latin2, e);
            let t2 = t_factor(latin2, e);
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };

        if !n.is_finite() || n.abs() < 1e-10 {
            return Err(bad_parallels("parallels are symmetric about the equator"));
        }

        let af = ellipsoid.a * m1 / (n * t1.powf(n));
        let rho0 = af * t_factor(lat0, e).powf(n);

        Ok(Self {
            lat0,
            lon0,
            latin1,
            latin2,
            ellipsoid,
            e,
            n,
            af,
            rho0,
        })
    }

    pub fn ellipsoid(&self) -> Ellipsoid {
        self.ellipsoid
    }

    /// Cone constant.
    pub fn cone_constant(&self) -> f64 {
        self.n
    }

    /// Convert geographic coordinates (degrees) to planar meters (x, y).
    pub fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let to_rad = PI / 180.0;
        let lat = lat_deg * to_rad;
        let lon = lon_deg * to_rad;

        // Normalize longitude difference to [-π, π]
        let mut dlon = lon - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let rho = if (lat.abs() - FRAC_PI_2).abs() < 1e-12 && lat * self.n > 0.0 {
            0.0
        } else {
            self.af * t_factor(lat, self.e).powf(self.n)
        };
        let theta = self.n * dlon;

        let x = rho * theta.sin();
        let y = self.rho0 - rho * theta.cos();
        (x, y)
    }

    /// Convert planar meters (x, y) to geographic coordinates (lat, lon) in degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let to_deg = 180.0 / PI;
        let sign = self.n.signum();

        let dy = self.rho0 - y;
        let rho = sign * (x * x + dy * dy).sqrt();
        if rho == 0.0 {
            return (sign * 90.0, self.lon0 * to_deg);
        }

        let theta = (sign * x).atan2(sign * dy);
        let t = (rho / self.af).powf(1.0 / self.n);

        let mut lat = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..MAX_INVERSE_ITERATIONS {
            let es = self.e * lat.sin();
            let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(self.e / 2.0)).atan();
            let converged = (next - lat).abs() < INVERSE_TOLERANCE;
            lat = next;
            if converged {
                break;
            }
        }

        let mut lon = theta / self.n + self.lon0;
        while lon > PI {
            lon -= 2.0 * PI;
        }
        while lon < -PI {
            lon += 2.0 * PI;
        }

        (lat * to_deg, lon * to_deg)
    }

    /// Project a point.
    pub fn project(&self, point: GeoPoint) -> (f64, f64) {
        self.forward(point.lat, point.lon)
    }
}

/// Snyder eq. 14-15.
fn m_factor(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    phi.cos() / (1.0 - es * es).sqrt()
}

/// Snyder eq. 15-9.
fn t_factor(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}
