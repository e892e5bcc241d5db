//! Distance weighting functions for objective analysis.
//!
//! Each function maps a distance between an observation and a grid point to a
//! weight in `[0, 1]`, given the radius of influence (ROI). All of them equal
//! (or are within rounding of) 1 at zero distance and never increase with
//! distance.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Weighting scheme used by the analysis kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightMethod {
    /// Cressman (1959), hard cutoff at the ROI
    #[default]
    Cressman,
    /// Barnes (1964) Gaussian, no cutoff
    Barnes,
    /// Gaspari and Cohn (1999) compact fifth-order polynomial, zero beyond 2·ROI
    GaspariCohn,
}

impl WeightMethod {
    /// Parse from a method tag (case-insensitive).
    ///
    /// Unrecognised tags fall back to Gaspari-Cohn.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "cressman" => Self::Cressman,
            "barnes" => Self::Barnes,
            "gaspari-cohn" | "gaspari_cohn" | "gasparicohn" | "gc" => Self::GaspariCohn,
            other => {
                warn!(method = %other, "Unknown weighting method, using Gaspari-Cohn");
                Self::GaspariCohn
            }
        }
    }

    /// Get the method tag as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cressman => "cressman",
            Self::Barnes => "barnes",
            Self::GaspariCohn => "gaspari-cohn",
        }
    }

    /// Weight for a single distance.
    pub fn weight(&self, distance: f64, roi: f64) -> f64 {
        match self {
            Self::Cressman => cressman(distance, roi),
            Self::Barnes => barnes(distance, roi),
            Self::GaspariCohn => gaspari_cohn(distance, roi),
        }
    }

    /// Weights for a slice of distances.
    pub fn weights(&self, distances: &[f64], roi: f64) -> Vec<f64> {
        distances.iter().map(|&d| self.weight(d, roi)).collect()
    }

    /// Distance beyond which the weight is zero or negligible.
    ///
    /// Barnes has no cutoff; at three ROIs its weight is below 1.3e-4.
    pub fn support_radius(&self, roi: f64) -> f64 {
        match self {
            Self::Cressman => roi,
            Self::Barnes => 3.0 * roi,
            Self::GaspariCohn => 2.0 * roi,
        }
    }
}

impl std::fmt::Display for WeightMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cressman weight: `(roi² − d²) / (roi² + d²)` inside the ROI, else 0.
pub fn cressman(distance: f64, roi: f64) -> f64 {
    let d = distance.abs();
    if d >= roi {
        return 0.0;
    }
    let r2 = roi * roi;
    let d2 = d * d;
    (r2 - d2) / (r2 + d2)
}

/// Barnes weight: `exp(−(d/roi)²)`.
pub fn barnes(distance: f64, roi: f64) -> f64 {
    let r = distance / roi;
    (-(r * r)).exp()
}

/// Gaspari-Cohn fifth-order piecewise rational function.
pub fn gaspari_cohn(distance: f64, roi: f64) -> f64 {
    let r = distance.abs() / roi;
    if r >= 2.0 {
        0.0
    } else if r >= 1.0 {
        let w = ((((r / 12.0 - 0.5) * r + 0.625) * r + 5.0 / 3.0) * r - 5.0) * r + 4.0
            - 2.0 / (3.0 * r);
        w.max(0.0)
    } else {
        (((-0.25 * r + 0.5) * r + 0.625) * r - 5.0 / 3.0) * r * r + 1.0
    }
}
