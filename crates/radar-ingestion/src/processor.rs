//! Per-volume processing.
//!
//! A volume moves through
//! `Loaded → Dealiased → GriddedReflectivity → GriddedVelocity → Masked →
//! Serialized → Done`, or stops early in `Skipped` when the input is too
//! small or cannot be decoded. Errors after loading fail that volume only.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use obs_seq::{
    ExchangeWriter, NoExchange, ObservationSerializer, ObservationTable, Provenance,
    ZarrTableWriter,
};
use radar_common::FieldKind;
use superob::{
    AnalysisGrid, GriddedField, ObjectiveAnalysis, QcMaskStage, RadarVolume, SuperobError,
};
use tracing::{debug, error, info, warn};

use crate::config::RadarPrepConfig;
use crate::dealias::{DealiasOutcome, Dealiaser, PrecomputedDealiaser};
use crate::discovery::VolumeInput;
use crate::error::{IngestionError, Result};
use crate::loader::{JsonVolumeLoader, VolumeLoader};

/// Processing stage of a volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeState {
    Loaded,
    Dealiased,
    GriddedReflectivity,
    GriddedVelocity,
    Masked,
    Serialized,
    Done,
    Skipped(SkipReason),
}

/// Why a volume was not processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TooSmall { size: u64, min_size: u64 },
    Unreadable(String),
    DecodeFailed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooSmall { size, min_size } => {
                write!(f, "file is {} bytes, minimum is {}", size, min_size)
            }
            Self::Unreadable(e) => write!(f, "file unreadable: {}", e),
            Self::DecodeFailed(e) => write!(f, "decode failed: {}", e),
        }
    }
}

/// Wall-clock time spent in each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub load: Duration,
    pub dealias: Duration,
    pub grid: Duration,
    pub mask: Duration,
    pub write: Duration,
}

/// A volume that produced an output store.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSummary {
    pub radar: String,
    pub output: std::path::PathBuf,
    /// Records written per field kind
    pub records: Vec<(FieldKind, usize)>,
    /// Field the velocity table was gridded from
    pub velocity_field: String,
    pub timings: StageTimings,
}

impl VolumeSummary {
    pub fn records_for(&self, kind: FieldKind) -> Option<usize> {
        self.records
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, n)| *n)
    }

    pub fn total_records(&self) -> usize {
        self.records.iter().map(|(_, n)| n).sum()
    }
}

/// Final result of processing one input.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeOutcome {
    Done(VolumeSummary),
    Skipped {
        path: std::path::PathBuf,
        reason: SkipReason,
    },
    Failed {
        path: std::path::PathBuf,
        error: String,
    },
}

impl VolumeOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// Runs the full pipeline for single volumes.
///
/// Holds no per-volume state, so one processor can be shared by many
/// workers.
#[derive(Clone)]
pub struct VolumeProcessor {
    config: RadarPrepConfig,
    qc: QcMaskStage,
    serializer: ObservationSerializer,
    writer: ZarrTableWriter,
    loader: Arc<dyn VolumeLoader>,
    dealiaser: Arc<dyn Dealiaser>,
    exchange: Arc<dyn ExchangeWriter>,
}

impl VolumeProcessor {
    /// Create a processor with the JSON loader, precomputed dealiaser and no
    /// exchange writer.
    pub fn new(config: RadarPrepConfig) -> Result<Self> {
        config.validate().map_err(IngestionError::InvalidConfig)?;
        Ok(Self {
            qc: QcMaskStage::from_spec(config.qc.clone(), &config.grid),
            serializer: ObservationSerializer::new(config.serialization.clone()),
            writer: ZarrTableWriter::new(config.serialization.chunk_size),
            loader: Arc::new(JsonVolumeLoader),
            dealiaser: Arc::new(PrecomputedDealiaser::default()),
            exchange: Arc::new(NoExchange),
            config,
        })
    }

    pub fn with_loader(mut self, loader: Arc<dyn VolumeLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_dealiaser(mut self, dealiaser: Arc<dyn Dealiaser>) -> Self {
        self.dealiaser = dealiaser;
        self
    }

    pub fn with_exchange(mut self, exchange: Arc<dyn ExchangeWriter>) -> Self {
        self.exchange = exchange;
        self
    }

    pub fn config(&self) -> &RadarPrepConfig {
        &self.config
    }

    /// Process one input. Never panics on bad data; failures are returned
    /// as [`VolumeOutcome::Failed`].
    pub fn process(&self, input: &VolumeInput) -> VolumeOutcome {
        match self.try_process(input) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(path = %input.path.display(), error = %e, "Volume processing failed");
                VolumeOutcome::Failed {
                    path: input.path.clone(),
                    error: e.to_string(),
                }
            }
        }
    }

    fn try_process(&self, input: &VolumeInput) -> Result<VolumeOutcome> {
        let path = input.path.as_path();
        let mut timings = StageTimings::default();

        if let Some(reason) = self.size_check(path) {
            return Ok(skipped(path, reason));
        }

        let t0 = Instant::now();
        let mut volume = match self.loader.load(path) {
            Ok(volume) => volume,
            Err(e) => return Ok(skipped(path, SkipReason::DecodeFailed(e.to_string()))),
        };
        timings.load = t0.elapsed();
        transition(path, VolumeState::Loaded);

        let t0 = Instant::now();
        let velocity_field = self.dealias(&mut volume)?;
        timings.dealias = t0.elapsed();
        transition(path, VolumeState::Dealiased);

        let t0 = Instant::now();
        let spec = &self.config.grid;
        let grid = AnalysisGrid::new(spec, &volume.site)?;
        let kernel = ObjectiveAnalysis::new(spec, &grid);

        let mut reflectivity = grid_or_skip(
            &kernel,
            &volume,
            &self.config.processing.reflectivity_field,
            FieldKind::Reflectivity,
        )?;
        transition(path, VolumeState::GriddedReflectivity);
        let mut mask_time = Duration::ZERO;
        if let Some(dbz) = reflectivity.as_mut() {
            let m0 = Instant::now();
            self.qc.mask_reflectivity(dbz, self.qc.config().thin_factor);
            mask_time += m0.elapsed();
        }

        let mut velocity = grid_or_skip(&kernel, &volume, &velocity_field, FieldKind::Velocity)?;
        transition(path, VolumeState::GriddedVelocity);
        timings.grid = t0.elapsed().saturating_sub(mask_time);

        let m0 = Instant::now();
        if let Some(vel) = velocity.as_mut() {
            match reflectivity.as_ref() {
                Some(dbz) => self.qc.mask_velocity(vel, dbz)?,
                None if self.qc.config().mask_velocity_with_reflectivity => {
                    warn!(path = %path.display(), "No reflectivity support, masking all velocity");
                    vel.mask.fill(true);
                    vel.apply_sentinel();
                }
                None => {}
            }
        }
        timings.mask = mask_time + m0.elapsed();
        transition(path, VolumeState::Masked);

        let tables = self.serialize(velocity.as_ref(), reflectivity.as_ref());
        transition(path, VolumeState::Serialized);

        let t0 = Instant::now();
        if let Err(e) = self.write_store(path, &input.output, &tables) {
            discard_output(&input.output);
            return Err(e);
        }
        timings.write = t0.elapsed();

        for field in velocity.iter().chain(reflectivity.iter()) {
            if let Err(e) = self
                .exchange
                .write(field, &grid, &self.config.serialization.errors)
            {
                warn!(
                    writer = self.exchange.name(),
                    field = %field.name,
                    error = %e,
                    "Exchange writer failed"
                );
            }
        }

        transition(path, VolumeState::Done);
        info!(
            path = %path.display(),
            output = %input.output.display(),
            load_ms = timings.load.as_millis() as u64,
            dealias_ms = timings.dealias.as_millis() as u64,
            grid_ms = timings.grid.as_millis() as u64,
            mask_ms = timings.mask.as_millis() as u64,
            write_ms = timings.write.as_millis() as u64,
            "Volume processed"
        );

        Ok(VolumeOutcome::Done(VolumeSummary {
            radar: input.radar.clone(),
            output: input.output.clone(),
            records: tables.iter().map(|t| (t.kind, t.len())).collect(),
            velocity_field,
            timings,
        }))
    }

    fn write_store(&self, path: &Path, output: &Path, tables: &[ObservationTable]) -> Result<()> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let source = path.file_name().map(|n| n.to_string_lossy().into_owned());
        self.writer
            .write(output, tables, &Provenance::now(source))?;
        Ok(())
    }

    fn size_check(&self, path: &Path) -> Option<SkipReason> {
        let min_size = self.config.processing.min_file_size;
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() < min_size => Some(SkipReason::TooSmall {
                size: meta.len(),
                min_size,
            }),
            Ok(_) => None,
            Err(e) => Some(SkipReason::Unreadable(e.to_string())),
        }
    }

    /// Returns the name of the velocity field to grid.
    fn dealias(&self, volume: &mut RadarVolume) -> Result<String> {
        let raw = self.config.processing.velocity_field.clone();
        let Some(method) = self.config.processing.unfold else {
            debug!("No dealiasing configured, gridding raw velocity");
            return Ok(raw);
        };

        match self.dealiaser.dealias(volume, &raw, method) {
            Ok(DealiasOutcome::Unfolded { field_name, fields }) => {
                if let Err(e) = volume.set_field(&field_name, fields) {
                    warn!(
                        method = method.as_str(),
                        field = %field_name,
                        error = %e,
                        "Unfolded velocity does not match the volume, gridding raw velocity"
                    );
                    return Ok(raw);
                }
                info!(method = method.as_str(), field = %field_name, "Velocity unfolded");
                Ok(field_name)
            }
            Ok(DealiasOutcome::UseRaw) => {
                info!(method = method.as_str(), "No unfolded velocity, gridding raw velocity");
                Ok(raw)
            }
            Err(e) => {
                warn!(method = method.as_str(), error = %e, "Dealiasing failed, gridding raw velocity");
                Ok(raw)
            }
        }
    }

    fn serialize(
        &self,
        velocity: Option<&GriddedField>,
        reflectivity: Option<&GriddedField>,
    ) -> Vec<ObservationTable> {
        let mut tables = vec![velocity
            .map(|f| self.serializer.serialize(f))
            .unwrap_or_else(|| ObservationTable::empty(FieldKind::Velocity))];

        if !self.config.processing.only_velocity {
            tables.push(
                reflectivity
                    .map(|f| self.serializer.serialize(f))
                    .unwrap_or_else(|| ObservationTable::empty(FieldKind::Reflectivity)),
            );
            tables.push(
                reflectivity
                    .map(|f| self.serializer.serialize_zero_layer(f))
                    .unwrap_or_else(|| ObservationTable::empty(FieldKind::ZeroReflectivity)),
            );
        }
        tables
    }
}

/// Grid a field, treating its absence as "no observations".
fn grid_or_skip(
    kernel: &ObjectiveAnalysis<'_>,
    volume: &RadarVolume,
    name: &str,
    kind: FieldKind,
) -> Result<Option<GriddedField>> {
    match kernel.grid_field(volume, name, kind) {
        Ok(field) => Ok(Some(field)),
        Err(SuperobError::MissingField(_)) => {
            warn!(field = %name, "Field not in volume, no observations for it");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn transition(path: &Path, state: VolumeState) {
    debug!(path = %path.display(), state = ?state, "Volume state");
}

fn skipped(path: &Path, reason: SkipReason) -> VolumeOutcome {
    warn!(path = %path.display(), reason = %reason, "Skipping volume");
    transition(path, VolumeState::Skipped(reason.clone()));
    VolumeOutcome::Skipped {
        path: path.to_path_buf(),
        reason,
    }
}

/// Remove a store left at `output` by an earlier run so a failed volume
/// leaves no output behind.
fn discard_output(output: &Path) {
    if output.is_dir() {
        if let Err(e) = std::fs::remove_dir_all(output) {
            warn!(output = %output.display(), error = %e, "Failed to remove stale output");
        }
    }
}
