//! Integration tests: run decoded volumes through the whole pipeline.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Duration;
use obs_seq::{ExchangeWriter, ObsErrorTable, ZarrTableReader};
use radar_common::FieldKind;
use radar_ingestion::{
    discover_inputs, AnalysisWindow, BatchRunner, DealiasMethod, DealiasOutcome, Dealiaser,
    IngestionError, RadarPrepConfig, SkipReason, VolumeDocument, VolumeInput, VolumeOutcome,
    VolumeProcessor,
};
use ndarray::Array2;
use superob::{AnalysisGrid, GriddedField, RadarVolume, SweepField};
use tempfile::TempDir;
use test_utils::{level2_file_name, sites, small_grid_spec, synthetic_volume, volume_time};

fn test_config(out: &Path) -> RadarPrepConfig {
    let mut config = RadarPrepConfig {
        grid: small_grid_spec(),
        ..Default::default()
    };
    config.processing.min_file_size = 0;
    config.processing.unfold = None;
    config.processing.output_dir = out.to_path_buf();
    config
}

fn write_volume(dir: &Path, volume: &RadarVolume, radar: &str) -> PathBuf {
    let path = dir.join(format!("{}.json", level2_file_name(radar, &volume.time)));
    VolumeDocument::from_volume(volume).write(&path).unwrap();
    path
}

fn storm_volume() -> RadarVolume {
    synthetic_volume(sites::KTLX, volume_time(), &[0.5, 1.5], 90, 120, 250.0)
}

#[test]
fn test_volume_produces_one_store() {
    let dir = TempDir::new().unwrap();
    let path = write_volume(dir.path(), &storm_volume(), "KTLX");
    let input = VolumeInput::from_file(&path, &dir.path().join("out")).unwrap();
    assert!(input
        .output
        .ends_with("obs_seq_KTLX_VR_20230510_2130.zarr"));

    let processor = VolumeProcessor::new(test_config(&dir.path().join("out"))).unwrap();
    let summary = match processor.process(&input) {
        VolumeOutcome::Done(summary) => summary,
        other => panic!("expected Done, got {:?}", other),
    };

    assert!(input.output.is_dir());
    assert_eq!(summary.velocity_field, "velocity");

    let reader = ZarrTableReader::open(&input.output).unwrap();
    assert_eq!(
        reader.kinds().unwrap(),
        vec![FieldKind::Velocity, FieldKind::Reflectivity, FieldKind::ZeroReflectivity]
    );

    let vel = reader.read_table(FieldKind::Velocity).unwrap();
    let dbz = reader.read_table(FieldKind::Reflectivity).unwrap();
    assert_eq!(Some(vel.len()), summary.records_for(FieldKind::Velocity));
    assert!(!vel.is_empty());
    // Velocity is only kept where reflectivity survived masking
    assert!(vel.len() <= dbz.len());
    assert!(vel.records.iter().all(|r| r.error_var == 9.0));

    let provenance = reader.provenance().unwrap();
    assert_eq!(
        provenance.source_volume.as_deref(),
        Some("KTLX20230510_213012_V06.json")
    );
}

#[test]
fn test_only_velocity_writes_one_table() {
    let dir = TempDir::new().unwrap();
    let path = write_volume(dir.path(), &storm_volume(), "KTLX");
    let mut config = test_config(dir.path());
    config.processing.only_velocity = true;

    let input = VolumeInput::from_file(&path, dir.path()).unwrap();
    let outcome = VolumeProcessor::new(config).unwrap().process(&input);
    assert!(outcome.is_done());

    let kinds = ZarrTableReader::open(&input.output).unwrap().kinds().unwrap();
    assert_eq!(kinds, vec![FieldKind::Velocity]);
}

#[test]
fn test_small_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    let path = write_volume(dir.path(), &storm_volume(), "KTLX");
    let mut config = test_config(dir.path());
    config.processing.min_file_size = 2_048_000_000;

    let input = VolumeInput::from_file(&path, dir.path()).unwrap();
    let outcome = VolumeProcessor::new(config).unwrap().process(&input);
    assert!(matches!(
        outcome,
        VolumeOutcome::Skipped {
            reason: SkipReason::TooSmall { .. },
            ..
        }
    ));
    assert!(!input.output.exists());
}

#[test]
fn test_undecodable_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("KTLX20230510_213012_V06");
    std::fs::write(&path, b"AR2V0006.not json").unwrap();

    let input = VolumeInput::from_file(&path, dir.path()).unwrap();
    let outcome = VolumeProcessor::new(test_config(dir.path()))
        .unwrap()
        .process(&input);
    assert!(matches!(
        outcome,
        VolumeOutcome::Skipped {
            reason: SkipReason::DecodeFailed(_),
            ..
        }
    ));
}

#[test]
fn test_volume_without_reflectivity_still_writes_store() {
    let dir = TempDir::new().unwrap();
    let mut volume = storm_volume();
    for sweep in &mut volume.sweeps {
        sweep.fields.remove("reflectivity");
    }
    let path = write_volume(dir.path(), &volume, "KTLX");

    let input = VolumeInput::from_file(&path, dir.path()).unwrap();
    let summary = match VolumeProcessor::new(test_config(dir.path()))
        .unwrap()
        .process(&input)
    {
        VolumeOutcome::Done(summary) => summary,
        other => panic!("expected Done, got {:?}", other),
    };
    assert_eq!(summary.total_records(), 0);
    assert!(input.output.is_dir());
}

#[test]
fn test_precomputed_unfolded_velocity_is_used() {
    let dir = TempDir::new().unwrap();
    let mut volume = storm_volume();
    for sweep in &mut volume.sweeps {
        let vel = sweep.fields["velocity"].clone();
        sweep.fields.insert("corrected_velocity".to_string(), vel);
    }
    let path = write_volume(dir.path(), &volume, "KTLX");
    let mut config = test_config(dir.path());
    config.processing.unfold = Some(DealiasMethod::Region);

    let input = VolumeInput::from_file(&path, dir.path()).unwrap();
    match VolumeProcessor::new(config).unwrap().process(&input) {
        VolumeOutcome::Done(summary) => assert_eq!(summary.velocity_field, "corrected_velocity"),
        other => panic!("expected Done, got {:?}", other),
    }
}

struct FailingDealiaser;

impl Dealiaser for FailingDealiaser {
    fn dealias(
        &self,
        _: &RadarVolume,
        _: &str,
        _: DealiasMethod,
    ) -> radar_ingestion::Result<DealiasOutcome> {
        Err(IngestionError::Dealias("no convergence".to_string()))
    }
}

#[derive(Default)]
struct RecordingExchange {
    fields: Mutex<Vec<String>>,
}

impl ExchangeWriter for RecordingExchange {
    fn name(&self) -> &str {
        "recording"
    }

    fn write(
        &self,
        field: &GriddedField,
        grid: &AnalysisGrid,
        errors: &ObsErrorTable,
    ) -> obs_seq::Result<()> {
        assert_eq!(field.shape().1, grid.shape().0);
        assert_eq!(errors.velocity, 3.0);
        self.fields.lock().unwrap().push(field.name.clone());
        Ok(())
    }
}

#[test]
fn test_dealias_failure_falls_back_to_raw_and_exchange_sees_fields() {
    let dir = TempDir::new().unwrap();
    let path = write_volume(dir.path(), &storm_volume(), "KTLX");
    let mut config = test_config(dir.path());
    config.processing.unfold = Some(DealiasMethod::Phase);

    let exchange = Arc::new(RecordingExchange::default());
    let processor = VolumeProcessor::new(config)
        .unwrap()
        .with_dealiaser(Arc::new(FailingDealiaser))
        .with_exchange(exchange.clone());

    let input = VolumeInput::from_file(&path, dir.path()).unwrap();
    match processor.process(&input) {
        VolumeOutcome::Done(summary) => assert_eq!(summary.velocity_field, "velocity"),
        other => panic!("expected Done, got {:?}", other),
    }
    assert_eq!(
        *exchange.fields.lock().unwrap(),
        vec!["velocity".to_string(), "reflectivity".to_string()]
    );
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = test_config(Path::new("out"));
    config.grid.grid_spacing = -1.0;
    assert!(matches!(
        VolumeProcessor::new(config),
        Err(IngestionError::InvalidConfig(_))
    ));
}

#[test]
fn test_batch_continues_past_bad_volumes() {
    let dir = TempDir::new().unwrap();
    let input_dir = dir.path().join("in");
    std::fs::create_dir_all(&input_dir).unwrap();

    write_volume(&input_dir, &storm_volume(), "KTLX");
    let later = synthetic_volume(
        sites::KVNX,
        volume_time() + Duration::minutes(5),
        &[0.5],
        90,
        120,
        250.0,
    );
    write_volume(&input_dir, &later, "KVNX");
    std::fs::write(input_dir.join("KTLX20230510_214012_V06"), b"garbage").unwrap();
    std::fs::write(input_dir.join("notes.txt"), b"ignored").unwrap();

    let out = dir.path().join("out");
    let inputs = discover_inputs(&input_dir, &out, None).unwrap();
    assert_eq!(inputs.len(), 3);

    let processor = VolumeProcessor::new(test_config(&out)).unwrap();
    let report = BatchRunner::new(processor)
        .with_threads(Some(2))
        .run(&inputs)
        .unwrap();

    assert_eq!(report.done, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.outcomes.len(), 3);
    assert!(out.join("obs_seq_KVNX_VR_20230510_2135.zarr").is_dir());
}

#[test]
fn test_window_picks_closest_volume() {
    let dir = TempDir::new().unwrap();
    for minutes in [-12, -4, 1, 9] {
        let t = volume_time() + Duration::minutes(minutes);
        std::fs::write(dir.path().join(level2_file_name("KTLX", &t)), b"x").unwrap();
    }

    let analysis = volume_time() - Duration::seconds(12);
    let config = RadarPrepConfig::default();
    let window = AnalysisWindow::new(analysis, &config.processing);
    let inputs = discover_inputs(dir.path(), Path::new("out"), Some(&window)).unwrap();

    assert_eq!(inputs.len(), 1);
    assert!(inputs[0]
        .path
        .ends_with(level2_file_name("KTLX", &(volume_time() + Duration::minutes(1)))));
    assert_eq!(inputs[0].time, analysis);
    assert_eq!(
        inputs[0].output,
        Path::new("out").join("obs_seq_KTLX_VR_20230510_2130.zarr")
    );
}

#[test]
fn test_empty_window_is_an_error() {
    let dir = TempDir::new().unwrap();
    let t = volume_time() + Duration::minutes(30);
    std::fs::write(dir.path().join(level2_file_name("KTLX", &t)), b"x").unwrap();

    let window = AnalysisWindow::new(volume_time(), &RadarPrepConfig::default().processing);
    assert!(matches!(
        discover_inputs(dir.path(), Path::new("out"), Some(&window)),
        Err(IngestionError::NoInputs(_))
    ));
}

#[test]
fn test_failed_write_does_not_stop_batch() {
    let dir = TempDir::new().unwrap();
    let input_dir = dir.path().join("in");
    std::fs::create_dir_all(&input_dir).unwrap();
    write_volume(&input_dir, &storm_volume(), "KTLX");
    let later = synthetic_volume(
        sites::KVNX,
        volume_time() + Duration::minutes(5),
        &[0.5],
        90,
        120,
        250.0,
    );
    write_volume(&input_dir, &later, "KVNX");

    let out = dir.path().join("out");
    let mut inputs = discover_inputs(&input_dir, &out, None).unwrap();
    assert_eq!(inputs[0].radar, "KTLX");

    // Output directory cannot be created under a regular file
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"x").unwrap();
    inputs[0].output = blocker.join("obs_seq_KTLX_VR_20230510_2130.zarr");

    let processor = VolumeProcessor::new(test_config(&out)).unwrap();
    let report = BatchRunner::new(processor)
        .with_threads(Some(2))
        .run(&inputs)
        .unwrap();

    assert_eq!(report.done, 1);
    assert_eq!(report.failed, 1);
    assert!(matches!(report.outcomes[0], VolumeOutcome::Failed { .. }));
    assert!(report.outcomes[1].is_done());
    assert!(!inputs[0].output.exists());
    assert!(out.join("obs_seq_KVNX_VR_20230510_2135.zarr").is_dir());
}

struct BadMaskDealiaser;

impl Dealiaser for BadMaskDealiaser {
    fn dealias(
        &self,
        volume: &RadarVolume,
        _: &str,
        _: DealiasMethod,
    ) -> radar_ingestion::Result<DealiasOutcome> {
        let fields = volume
            .sweeps
            .iter()
            .map(|sweep| SweepField {
                data: Array2::zeros((sweep.n_rays(), sweep.n_gates())),
                mask: Array2::from_elem((1, 1), false),
            })
            .collect();
        Ok(DealiasOutcome::Unfolded {
            field_name: "corrected_velocity".to_string(),
            fields,
        })
    }
}

#[test]
fn test_malformed_unfolded_velocity_falls_back_to_raw() {
    let dir = TempDir::new().unwrap();
    let path = write_volume(dir.path(), &storm_volume(), "KTLX");
    let mut config = test_config(dir.path());
    config.processing.unfold = Some(DealiasMethod::Region);

    let processor = VolumeProcessor::new(config)
        .unwrap()
        .with_dealiaser(Arc::new(BadMaskDealiaser));

    let input = VolumeInput::from_file(&path, dir.path()).unwrap();
    match processor.process(&input) {
        VolumeOutcome::Done(summary) => {
            assert_eq!(summary.velocity_field, "velocity");
            assert!(summary.records_for(FieldKind::Velocity).unwrap() > 0);
        }
        other => panic!("expected Done, got {:?}", other),
    }
}
