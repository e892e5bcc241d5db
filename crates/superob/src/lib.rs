//! Radar Superobservation Gridding
//!
//! Turns polar radar sweeps into quality-controlled Cartesian grids ready to
//! be flattened into assimilation observations.
//!
//! # Architecture
//!
//! ```text
//! RadarVolume (decoded sweeps)
//!      │
//!      ▼
//! AnalysisGrid::new(spec, site)        conformal conic grid + lat/lon
//!      │
//!      ▼
//! ObjectiveAnalysis::grid_field()      weighted mean per grid point per sweep
//!      │                                (Cressman / Barnes / Gaspari-Cohn)
//!      ▼
//! GriddedField
//!      │
//!      ▼
//! QcMaskStage::mask_reflectivity()     echo / zero-echo / halo / ceiling
//! QcMaskStage::mask_velocity()         reflectivity support / speed / ceiling
//!      │
//!      ▼
//! masked GriddedField → serializer
//! ```
//!
//! # Example
//!
//! ```ignore
//! use superob::{AnalysisGrid, AnalysisGridSpec, ObjectiveAnalysis, QcConfig, QcMaskStage};
//! use radar_common::FieldKind;
//!
//! let spec = AnalysisGridSpec::default();
//! let grid = AnalysisGrid::new(&spec, &volume.site)?;
//! let kernel = ObjectiveAnalysis::new(&spec, &grid);
//!
//! let mut dbz = kernel.grid_field(&volume, "reflectivity", FieldKind::Reflectivity)?;
//! let qc = QcMaskStage::from_spec(QcConfig::default(), &spec);
//! qc.mask_reflectivity(&mut dbz, 4);
//! ```

pub mod beam;
pub mod config;
pub mod error;
pub mod field;
pub mod grid;
pub mod kernel;
pub mod morphology;
pub mod qc;
pub mod volume;
pub mod weights;

// Re-export commonly used types at crate root
pub use beam::{gate_position, GatePosition};
pub use config::{AnalysisGridSpec, GridReference, HaloPolicy, QcConfig, ZeroEchoConfig};
pub use error::{Result, SuperobError};
pub use field::{GriddedField, GriddedFieldParts, ZeroEchoLayer};
pub use grid::AnalysisGrid;
pub use kernel::{LevelAnalysis, ObjectiveAnalysis, PlanarGate};
pub use morphology::maximum_filter;
pub use qc::{QcMaskStage, HALO_THRESHOLD};
pub use volume::{RadarVolume, Sweep, SweepField};
pub use weights::WeightMethod;
