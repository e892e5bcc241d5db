//! Configuration for gridding and QC masking.
//!
//! All structs are immutable values handed to the grid constructor, the
//! analysis kernel and the mask stage. Defaults match the operational
//! 3 km superobservation setup.

use radar_common::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::weights::WeightMethod;

// ============================================================================
// Analysis Grid
// ============================================================================

/// Geometry and acceptance thresholds for the analysis grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisGridSpec {
    /// Horizontal grid spacing (meters).
    pub grid_spacing: f64,

    /// Half-width of a radar-centred domain (meters).
    pub domain_radius: f64,

    /// Fixed-extent grid centred on an external point instead of the radar.
    pub reference: Option<GridReference>,

    /// Standard parallels of the conformal conic projection (degrees).
    pub standard_parallels: [f64; 2],

    /// Weighting scheme.
    pub method: WeightMethod,

    /// Radius of influence (meters).
    pub roi: f64,

    /// Explicit candidate search radius (meters). Defaults to the support
    /// radius of the weighting method.
    pub max_search_radius: Option<f64>,

    /// Minimum number of contributing gates for a cell to be accepted.
    pub min_count: usize,

    /// Minimum weight sum for a cell to be accepted.
    pub min_weight: f64,

    /// Gates closer to the radar than this are ignored (meters).
    pub min_range: f64,

    /// Gates farther from the radar than this are ignored (meters).
    pub max_range: f64,

    /// Height above the radar above which gridded cells are masked (meters).
    /// Zero or negative disables the ceiling.
    pub height_ceiling: f64,
}

impl Default for AnalysisGridSpec {
    fn default() -> Self {
        Self {
            grid_spacing: 3000.0,
            domain_radius: 150_000.0,
            reference: None,
            standard_parallels: [30.0, 60.0],
            method: WeightMethod::Cressman,
            roi: 1000.0,
            max_search_radius: None,
            min_count: 3,
            min_weight: 0.2,
            min_range: 10_000.0,
            max_range: 150_000.0,
            height_ceiling: 10_000.0,
        }
    }
}

impl AnalysisGridSpec {
    /// Set spacing and derive the matching radius of influence.
    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.grid_spacing = spacing;
        self.roi = spacing / 0.707;
        self
    }

    /// Radius within which gates are considered for a grid point.
    pub fn search_radius(&self) -> f64 {
        self.max_search_radius
            .unwrap_or_else(|| self.method.support_radius(self.roi))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.grid_spacing.is_finite() && self.grid_spacing > 0.0) {
            return Err(format!("grid_spacing must be > 0, got {}", self.grid_spacing));
        }

        if !(self.roi.is_finite() && self.roi > 0.0) {
            return Err(format!("roi must be > 0, got {}", self.roi));
        }

        if let Some(radius) = self.max_search_radius {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(format!("max_search_radius must be > 0, got {}", radius));
            }
        }

        match &self.reference {
            None => {
                if !(self.domain_radius.is_finite() && self.domain_radius > 0.0) {
                    return Err(format!(
                        "domain_radius must be > 0, got {}",
                        self.domain_radius
                    ));
                }
            }
            Some(reference) => reference.validate()?,
        }

        if self.min_range < 0.0 || self.max_range <= self.min_range {
            return Err(format!(
                "range window [{}, {}] is empty",
                self.min_range, self.max_range
            ));
        }

        if self.min_weight < 0.0 {
            return Err("min_weight must be >= 0".to_string());
        }

        Ok(())
    }
}

/// External grid centre with a fixed domain size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridReference {
    pub center: GeoPoint,
    /// East-west domain size (meters).
    pub extent_x: f64,
    /// North-south domain size (meters).
    pub extent_y: f64,
}

impl GridReference {
    pub fn new(center: GeoPoint, extent_x: f64, extent_y: f64) -> Self {
        Self {
            center,
            extent_x,
            extent_y,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.center.is_valid() {
            return Err(format!("invalid reference point {:?}", self.center));
        }
        if !(self.extent_x.is_finite() && self.extent_x > 0.0)
            || !(self.extent_y.is_finite() && self.extent_y > 0.0)
        {
            return Err(format!(
                "reference extent must be > 0, got {} x {}",
                self.extent_x, self.extent_y
            ));
        }
        Ok(())
    }
}

// ============================================================================
// QC Masking
// ============================================================================

/// How weak echo next to strong echo is treated when zero-echo synthesis
/// is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaloPolicy {
    /// Weak cells inside the halo are masked.
    #[default]
    Mask,
    /// Weak cells inside the halo keep their native value.
    Retain,
}

/// Synthetic clear-air layer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeroEchoConfig {
    pub enabled: bool,
    /// Height of the layer above the radar (meters).
    pub layer_height: f64,
}

impl Default for ZeroEchoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            layer_height: 6000.0,
        }
    }
}

/// QC mask stage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcConfig {
    /// Reflectivity at or above this is treated as echo (dBZ).
    pub min_dbz_analysis: f32,

    /// Side length of the halo max-filter footprint (cells).
    pub halo_footprint: usize,

    /// Stride used to thin zero-reflectivity cells. Zero disables thinning.
    pub thin_factor: usize,

    pub halo_policy: HaloPolicy,

    pub zero_echo: ZeroEchoConfig,

    /// OR the reflectivity mask into the velocity mask.
    pub mask_velocity_with_reflectivity: bool,

    /// Physical bound on radial velocity magnitude (m/s).
    pub max_radial_velocity: f32,

    /// Optional bound as a multiple of each sweep's Nyquist velocity.
    pub max_nyquist_factor: Option<f32>,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            min_dbz_analysis: 25.0,
            halo_footprint: 3,
            thin_factor: 4,
            halo_policy: HaloPolicy::Mask,
            zero_echo: ZeroEchoConfig::default(),
            mask_velocity_with_reflectivity: true,
            max_radial_velocity: 50.0,
            max_nyquist_factor: None,
        }
    }
}

impl QcConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.min_dbz_analysis.is_finite() {
            return Err("min_dbz_analysis must be finite".to_string());
        }

        if !(self.max_radial_velocity > 0.0) {
            return Err("max_radial_velocity must be > 0".to_string());
        }

        if let Some(factor) = self.max_nyquist_factor {
            if !(factor > 0.0) {
                return Err("max_nyquist_factor must be > 0".to_string());
            }
        }

        if self.zero_echo.enabled && !(self.zero_echo.layer_height >= 0.0) {
            return Err("zero_echo.layer_height must be >= 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(AnalysisGridSpec::default().validate().is_ok());
        assert!(QcConfig::default().validate().is_ok());
    }

    #[test]
    fn test_spacing_sets_roi() {
        let spec = AnalysisGridSpec::default().with_spacing(1000.0);
        assert!((spec.roi - 1000.0 / 0.707).abs() < 1e-9);
        assert_eq!(spec.search_radius(), spec.roi);
    }

    #[test]
    fn test_invalid_specs() {
        let spec = AnalysisGridSpec {
            grid_spacing: 0.0,
            ..Default::default()
        };
        assert!(spec.validate().is_err());

        let spec = AnalysisGridSpec {
            roi: -1.0,
            ..Default::default()
        };
        assert!(spec.validate().is_err());

        let spec = AnalysisGridSpec {
            reference: Some(GridReference::new(GeoPoint::new(35.0, -97.0), 0.0, 1.0)),
            ..Default::default()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "grid_spacing: 2000.0\nmethod: barnes\n";
        let spec: AnalysisGridSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.grid_spacing, 2000.0);
        assert_eq!(spec.method, WeightMethod::Barnes);
        assert_eq!(spec.min_count, 3);

        let qc: QcConfig = serde_yaml::from_str("halo_policy: retain\n").unwrap();
        assert_eq!(qc.halo_policy, HaloPolicy::Retain);
        assert!(qc.zero_echo.enabled);
    }
}
