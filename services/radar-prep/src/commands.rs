//! Subcommand implementations.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use obs_seq::{combine_tables, find_stores, ZarrTableWriter};
use radar_common::{parse_window_time, FieldKind};
use radar_ingestion::{
    discover_inputs, AnalysisWindow, BatchRunner, DealiasMethod, RadarPrepConfig, VolumeInput,
    VolumeOutcome, VolumeProcessor,
};
use superob::WeightMethod;
use tracing::{error, info, warn};

use crate::config_loader::{load_config, validate_config};
use crate::{CombineArgs, ProcessArgs};

/// Apply command-line overrides on top of the file configuration.
pub fn apply_overrides(config: &mut RadarPrepConfig, args: &ProcessArgs) {
    if let Some(method) = &args.method {
        config.grid.method = WeightMethod::from_str(method);
    }
    if let Some(dx) = args.dx {
        config.grid = config.grid.clone().with_spacing(dx);
    }
    if let Some(roi) = args.roi {
        config.grid.roi = roi;
    }
    if let Some(unfold) = &args.unfold {
        config.processing.unfold = DealiasMethod::parse(unfold);
    }
    if args.only_vr {
        config.processing.only_velocity = true;
    }
    if args.threads.is_some() {
        config.processing.threads = args.threads;
    }
    if let Some(out) = &args.out {
        config.processing.output_dir = out.clone();
    }
}

pub fn process(args: &ProcessArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => RadarPrepConfig::default(),
    };
    apply_overrides(&mut config, args);
    validate_config(&config)?;

    info!(
        method = config.grid.method.as_str(),
        dx = config.grid.grid_spacing,
        roi = config.grid.roi,
        unfold = config.processing.unfold.map(|m| m.as_str()).unwrap_or("none"),
        "Loaded configuration"
    );

    let output_dir = config.processing.output_dir.clone();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    let inputs = match (&args.file, &args.dir) {
        (Some(file), _) => vec![VolumeInput::from_file(file, &output_dir)?],
        (None, Some(dir)) => {
            let window = match &args.window {
                Some(w) => {
                    let time = parse_window_time(w)
                        .with_context(|| format!("Invalid --window {}", w))?;
                    Some(AnalysisWindow::new(time, &config.processing))
                }
                None => None,
            };
            discover_inputs(dir, &output_dir, window.as_ref())?
        }
        (None, None) => bail!("either --file or --dir is required"),
    };

    let processor = VolumeProcessor::new(config)?;
    let report = BatchRunner::new(processor).run(&inputs)?;

    for outcome in &report.outcomes {
        match outcome {
            VolumeOutcome::Done(summary) => info!(
                radar = %summary.radar,
                output = %summary.output.display(),
                records = summary.total_records(),
                "Wrote observations"
            ),
            VolumeOutcome::Skipped { path, reason } => {
                warn!(path = %path.display(), reason = %reason, "Skipped")
            }
            VolumeOutcome::Failed { path, error } => {
                error!(path = %path.display(), error = %error, "Failed")
            }
        }
    }
    info!(
        done = report.done,
        skipped = report.skipped,
        failed = report.failed,
        "Processing complete"
    );
    Ok(())
}

/// `obs_seq_<suffix>` next to the inputs.
pub fn default_combined_output(args: &CombineArgs) -> PathBuf {
    let suffix = args.suffix.trim_start_matches('_');
    args.dir.join(format!("obs_seq_{}", suffix))
}

pub fn combine(args: &CombineArgs) -> Result<()> {
    let kind = FieldKind::from_str(&args.field)
        .with_context(|| format!("Unknown field {}", args.field))?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_combined_output(args));

    let inputs: Vec<PathBuf> = find_stores(&args.dir, &args.suffix)
        .with_context(|| format!("Failed to list {:?}", args.dir))?
        .into_iter()
        .filter(|p| *p != output)
        .collect();
    if inputs.is_empty() {
        bail!("no stores in {:?} ending with {}", args.dir, args.suffix);
    }

    let report = combine_tables(&inputs, &output, kind, &ZarrTableWriter::default())?;
    info!(
        output = %output.display(),
        records = report.records,
        "Combine complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dx_override_sets_roi() {
        let mut config = RadarPrepConfig::default();
        let args = ProcessArgs {
            dx: Some(1414.0),
            ..Default::default()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.grid.grid_spacing, 1414.0);
        assert!((config.grid.roi - 1414.0 / 0.707).abs() < 1e-9);
    }

    #[test]
    fn test_roi_override_wins_over_dx() {
        let mut config = RadarPrepConfig::default();
        let args = ProcessArgs {
            dx: Some(1000.0),
            roi: Some(2500.0),
            method: Some("barnes".to_string()),
            unfold: Some("none".to_string()),
            only_vr: true,
            ..Default::default()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.grid.roi, 2500.0);
        assert_eq!(config.grid.method, WeightMethod::Barnes);
        assert_eq!(config.processing.unfold, None);
        assert!(config.processing.only_velocity);
    }

    #[test]
    fn test_default_combined_output() {
        let args = CombineArgs {
            dir: PathBuf::from("/data/obs"),
            suffix: "_VR_20230510_2130.zarr".to_string(),
            output: None,
            field: "velocity".to_string(),
        };
        assert_eq!(
            default_combined_output(&args),
            PathBuf::from("/data/obs/obs_seq_VR_20230510_2130.zarr")
        );
    }
}
