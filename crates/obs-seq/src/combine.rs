//! Concatenation of several observation stores into one.

use std::path::{Path, PathBuf};

use radar_common::FieldKind;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::record::{ObservationTable, Provenance};
use crate::zarr::{ZarrTableReader, ZarrTableWriter};

/// Summary of a combine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombineReport {
    /// Inputs that contributed records.
    pub used: usize,
    /// Inputs that could not be read or held no records of the kind.
    pub skipped: usize,
    pub records: usize,
}

/// Concatenate the `kind` tables of `inputs`, in input order, into a new
/// store at `output`.
///
/// Unreadable or empty inputs are skipped with a warning. The output store
/// is written even if nothing was usable.
pub fn combine_tables(
    inputs: &[PathBuf],
    output: &Path,
    kind: FieldKind,
    writer: &ZarrTableWriter,
) -> Result<CombineReport> {
    let mut combined = ObservationTable::empty(kind);
    let mut report = CombineReport::default();

    for input in inputs {
        match ZarrTableReader::read(input, kind) {
            Ok(table) if !table.is_empty() => {
                report.used += 1;
                combined.extend(table);
            }
            Ok(_) => {
                warn!(path = %input.display(), kind = %kind, "No observations, skipping");
                report.skipped += 1;
            }
            Err(e) => {
                warn!(path = %input.display(), error = %e, "Unreadable store, skipping");
                report.skipped += 1;
            }
        }
    }
    report.records = combined.len();

    let source = format!("combined from {} stores", report.used);
    writer.write(output, &[combined], &Provenance::now(Some(source)))?;

    info!(
        output = %output.display(),
        used = report.used,
        skipped = report.skipped,
        records = report.records,
        "Combined observation stores"
    );
    Ok(report)
}

/// Stores directly inside `dir` whose names end with `suffix`, sorted by name.
pub fn find_stores(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let matches = entry
            .file_name()
            .to_str()
            .map(|n| n.ends_with(suffix))
            .unwrap_or(false);
        if matches && entry.file_type().is_dir() {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}
