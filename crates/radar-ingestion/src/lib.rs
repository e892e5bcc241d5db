//! Radar volume processing.
//!
//! Drives decoded radar volumes through gridding, masking and serialization,
//! one output store per volume.
//!
//! # Architecture
//!
//! ```text
//! discover_inputs(dir, window)          Level-II names → VolumeInput
//!      │
//!      ▼
//! BatchRunner::run()                     one volume per rayon worker
//!      │
//!      ▼
//! VolumeProcessor::process()
//!      ├─ size check / VolumeLoader      → Skipped
//!      ├─ Dealiaser                      unfolded or raw velocity
//!      ├─ ObjectiveAnalysis              reflectivity, velocity
//!      ├─ QcMaskStage                    reflectivity, then velocity
//!      ├─ ObservationSerializer
//!      ├─ ZarrTableWriter                obs_seq_{RADAR}_VR_{stamp}.zarr
//!      └─ ExchangeWriter
//! ```

pub mod batch;
pub mod config;
pub mod dealias;
pub mod discovery;
pub mod error;
pub mod loader;
pub mod processor;

// Re-exports
pub use batch::{BatchReport, BatchRunner};
pub use config::{ProcessingConfig, RadarPrepConfig};
pub use dealias::{DealiasMethod, DealiasOutcome, Dealiaser, PrecomputedDealiaser};
pub use discovery::{discover_inputs, parse_level2_name, AnalysisWindow, Level2Name, VolumeInput};
pub use error::{IngestionError, Result};
pub use loader::{JsonVolumeLoader, SweepDocument, VolumeDocument, VolumeLoader};
pub use processor::{
    SkipReason, StageTimings, VolumeOutcome, VolumeProcessor, VolumeState, VolumeSummary,
};
