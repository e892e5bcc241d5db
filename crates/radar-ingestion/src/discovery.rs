//! Input file discovery.
//!
//! Level-II volumes are named `KTLX20230510_213012_V06` (archive style) or
//! `KTLX_20230510_213012` (LDM style). The radar and scan time are read from
//! the name.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use obs_seq::output_file_name;
use radar_common::parse_compact_time;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::{IngestionError, Result};

/// Radar and scan time parsed from a volume file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level2Name {
    pub radar: String,
    pub time: DateTime<Utc>,
}

/// Parse a Level-II style file name.
pub fn parse_level2_name(file_name: &str) -> Option<Level2Name> {
    let radar = file_name.get(..4)?;
    if !radar.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let rest = file_name[4..].strip_prefix('_').unwrap_or(&file_name[4..]);
    let stamp = rest.get(..15)?;
    let time = parse_compact_time(stamp).ok()?;
    Some(Level2Name {
        radar: radar.to_uppercase(),
        time,
    })
}

/// Analysis time with the search window around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindow {
    pub time: DateTime<Utc>,
    pub before: Duration,
    pub after: Duration,
}

impl AnalysisWindow {
    pub fn new(time: DateTime<Utc>, config: &ProcessingConfig) -> Self {
        Self {
            time,
            before: Duration::minutes(config.window_before_minutes),
            after: Duration::minutes(config.window_after_minutes),
        }
    }

    pub fn contains(&self, t: &DateTime<Utc>) -> bool {
        *t >= self.time - self.before && *t <= self.time + self.after
    }
}

/// One volume file to process and where its output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInput {
    pub path: PathBuf,
    pub radar: String,
    /// Time used to name the output
    pub time: DateTime<Utc>,
    pub output: PathBuf,
}

impl VolumeInput {
    /// Input for a single named file, stamped with its own scan time.
    pub fn from_file(path: &Path, output_dir: &Path) -> Result<Self> {
        let name = file_name(path)
            .and_then(parse_level2_name)
            .ok_or_else(|| {
                IngestionError::NoInputs(format!(
                    "{} is not a Level-II style file name",
                    path.display()
                ))
            })?;
        Ok(Self::stamped(path, name.radar, name.time, output_dir))
    }

    fn stamped(path: &Path, radar: String, time: DateTime<Utc>, output_dir: &Path) -> Self {
        let output = output_dir.join(output_file_name(&radar, &time));
        Self {
            path: path.to_path_buf(),
            radar,
            time,
            output,
        }
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// Find volume files directly inside `dir`.
///
/// Without a window every parseable file is returned, each named by its own
/// scan time. With a window only the file closest to the analysis time is
/// returned, named by the analysis time.
pub fn discover_inputs(
    dir: &Path,
    output_dir: &Path,
    window: Option<&AnalysisWindow>,
) -> Result<Vec<VolumeInput>> {
    let mut candidates = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| IngestionError::Other(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        match file_name(entry.path()).and_then(parse_level2_name) {
            Some(name) => candidates.push((entry.into_path(), name)),
            None => debug!(path = %entry.path().display(), "Not a volume file name, ignoring"),
        }
    }

    let inputs: Vec<VolumeInput> = match window {
        None => candidates
            .into_iter()
            .map(|(path, name)| VolumeInput::stamped(&path, name.radar, name.time, output_dir))
            .collect(),
        Some(window) => candidates
            .into_iter()
            .filter(|(_, name)| window.contains(&name.time))
            .min_by_key(|(_, name)| (name.time - window.time).num_seconds().abs())
            .map(|(path, name)| VolumeInput::stamped(&path, name.radar, window.time, output_dir))
            .into_iter()
            .collect(),
    };

    if inputs.is_empty() {
        return Err(IngestionError::NoInputs(match window {
            Some(w) => format!(
                "no volume in {} between {} and {}",
                dir.display(),
                w.time - w.before,
                w.time + w.after
            ),
            None => format!("no volume files in {}", dir.display()),
        }));
    }

    info!(
        dir = %dir.display(),
        count = inputs.len(),
        first = %inputs[0].path.display(),
        "Discovered input volumes"
    );
    Ok(inputs)
}
