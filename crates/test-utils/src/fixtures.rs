//! Common test fixtures for radar processing tests.
//!
//! Pre-defined sites, times and configurations that represent common
//! scenarios.

use chrono::{DateTime, TimeZone, Utc};
use radar_common::RadarSite;
use superob::{AnalysisGridSpec, QcConfig};

/// Common radar sites for testing.
pub mod sites {
    use radar_common::RadarSite;

    /// Oklahoma City, OK
    pub const KTLX: RadarSite = RadarSite {
        lat: 35.333,
        lon: -97.278,
        alt: 370.0,
    };

    /// Vance AFB, OK
    pub const KVNX: RadarSite = RadarSite {
        lat: 36.741,
        lon: -98.128,
        alt: 378.0,
    };

    /// Sea-level site on the equator.
    pub const EQUATOR: RadarSite = RadarSite {
        lat: 0.0,
        lon: 0.0,
        alt: 0.0,
    };
}

/// Volume start time used across tests: 2023-05-10 21:30:12 UTC.
pub fn volume_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 5, 10, 21, 30, 12).unwrap()
}

/// Level-II style file name, e.g. `KTLX20230510_213012_V06`.
pub fn level2_file_name(radar: &str, time: &DateTime<Utc>) -> String {
    format!("{}{}_V06", radar, time.format("%Y%m%d_%H%M%S"))
}

/// Small radar-centred grid (21 x 21 points at 3 km) for fast tests.
pub fn small_grid_spec() -> AnalysisGridSpec {
    AnalysisGridSpec {
        grid_spacing: 3000.0,
        domain_radius: 30_000.0,
        roi: 3000.0 / 0.707,
        min_range: 0.0,
        max_range: 60_000.0,
        ..Default::default()
    }
}

/// QC configuration with zero-echo synthesis off.
pub fn qc_without_zero_layer() -> QcConfig {
    let mut qc = QcConfig::default();
    qc.zero_echo.enabled = false;
    qc
}

/// Site used when a test does not care where the radar is.
pub fn default_site() -> RadarSite {
    sites::KTLX
}
