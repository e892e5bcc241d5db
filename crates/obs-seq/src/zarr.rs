//! Zarr V3 persistence of observation tables.
//!
//! One store per processed volume:
//!
//! ```text
//! obs_seq_KTLX_VR_20230510_2130.zarr/
//!   zarr.json                 root group: history, version, source_volume, fields
//!   velocity/zarr.json        group: count, units
//!   velocity/value/...        1-D array along `index`
//!   velocity/date/...         [index, 19] u8 characters
//!   reflectivity/...
//!   0reflectivity/...
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use radar_common::{FieldKind, DART_DATE_LEN};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::{Group, GroupBuilder};
use zarrs_filesystem::FilesystemStore;

use crate::error::{ObsSeqError, Result};
use crate::record::{ObservationRecord, ObservationTable, Provenance};

type Store = FilesystemStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    F32,
    F64,
    I64,
    Chars,
}

/// Schema entry for one output column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub units: &'static str,
    pub description: &'static str,
    ty: ColumnType,
}

const fn column(
    name: &'static str,
    units: &'static str,
    description: &'static str,
    ty: ColumnType,
) -> ColumnSpec {
    ColumnSpec {
        name,
        units,
        description,
        ty,
    }
}

/// Output columns, in storage order.
pub const COLUMNS: &[ColumnSpec] = &[
    column("value", "", "observed value", ColumnType::F32),
    column("lat", "degrees_north", "observation latitude", ColumnType::F64),
    column("lon", "degrees_east", "observation longitude", ColumnType::F64),
    column("height", "m", "observation height above mean sea level", ColumnType::F64),
    column("error_var", "", "observation error variance", ColumnType::F32),
    column("utime", "s", "seconds since 1970-01-01 00:00:00 UTC", ColumnType::F64),
    column("date", "", "observation time %Y-%m-%d_%H:%M:%S", ColumnType::Chars),
    column("day", "days", "days since 1601-01-01", ColumnType::I64),
    column("second", "s", "seconds into day", ColumnType::I64),
    column("platform_lat", "degrees_north", "radar latitude", ColumnType::F64),
    column("platform_lon", "degrees_east", "radar longitude", ColumnType::F64),
    column("platform_hgt", "m", "radar height above mean sea level", ColumnType::F64),
    column("platform_dir1", "", "east direction cosine from radar", ColumnType::F64),
    column("platform_dir2", "", "north direction cosine from radar", ColumnType::F64),
    column("platform_dir3", "", "vertical direction cosine from radar", ColumnType::F64),
    column("platform_nyquist", "m/s", "nyquist velocity of the sweep", ColumnType::F32),
];

/// Values of one column, typed for storage.
#[derive(Debug, Clone, PartialEq)]
enum ColumnData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I64(Vec<i64>),
    /// Row-major `[n, DART_DATE_LEN]` bytes
    Chars(Vec<u8>),
}

fn f32_column(records: &[ObservationRecord], f: impl Fn(&ObservationRecord) -> f32) -> ColumnData {
    ColumnData::F32(records.iter().map(f).collect())
}

fn f64_column(records: &[ObservationRecord], f: impl Fn(&ObservationRecord) -> f64) -> ColumnData {
    ColumnData::F64(records.iter().map(f).collect())
}

fn i64_column(records: &[ObservationRecord], f: impl Fn(&ObservationRecord) -> i64) -> ColumnData {
    ColumnData::I64(records.iter().map(f).collect())
}

fn date_chars(date: &str) -> [u8; DART_DATE_LEN] {
    let mut out = [b' '; DART_DATE_LEN];
    for (dst, src) in out.iter_mut().zip(date.bytes()) {
        *dst = src;
    }
    out
}

fn column_data(spec: &ColumnSpec, records: &[ObservationRecord]) -> ColumnData {
    match spec.name {
        "value" => f32_column(records, |r| r.value),
        "lat" => f64_column(records, |r| r.lat),
        "lon" => f64_column(records, |r| r.lon),
        "height" => f64_column(records, |r| r.height),
        "error_var" => f32_column(records, |r| r.error_var),
        "utime" => f64_column(records, |r| r.utime),
        "date" => ColumnData::Chars(records.iter().flat_map(|r| date_chars(&r.date)).collect()),
        "day" => i64_column(records, |r| r.day),
        "second" => i64_column(records, |r| r.second),
        "platform_lat" => f64_column(records, |r| r.platform_lat),
        "platform_lon" => f64_column(records, |r| r.platform_lon),
        "platform_hgt" => f64_column(records, |r| r.platform_hgt),
        "platform_dir1" => f64_column(records, |r| r.platform_dir1),
        "platform_dir2" => f64_column(records, |r| r.platform_dir2),
        "platform_dir3" => f64_column(records, |r| r.platform_dir3),
        _ => f32_column(records, |r| r.platform_nyquist),
    }
}

fn write_err(e: impl std::fmt::Display) -> ObsSeqError {
    ObsSeqError::serialization(e.to_string())
}

fn read_err(e: impl std::fmt::Display) -> ObsSeqError {
    ObsSeqError::read_failed(e.to_string())
}

/// Hidden sibling of `path` used while a store is being built.
fn staging_path(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| ObsSeqError::serialization(format!("no file name in {:?}", path)))?;
    Ok(path.with_file_name(format!(".{}.partial", name.to_string_lossy())))
}

fn remove_path(path: &Path) -> Result<()> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Writes observation tables to a Zarr V3 directory store.
#[derive(Debug, Clone)]
pub struct ZarrTableWriter {
    chunk_size: usize,
}

impl Default for ZarrTableWriter {
    fn default() -> Self {
        Self::new(65_536)
    }
}

impl ZarrTableWriter {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Write `tables` to a fresh store at `path`, replacing anything there.
    ///
    /// The store is always created, even when every table is empty. It is
    /// built in a sibling staging directory and moved onto `path` only once
    /// every table is written; on failure nothing new appears at `path` and
    /// a previous store there is left as it was.
    pub fn write(
        &self,
        path: &Path,
        tables: &[ObservationTable],
        provenance: &Provenance,
    ) -> Result<()> {
        let staging = staging_path(path)?;
        remove_path(&staging)?;

        if let Err(e) = self.write_store(&staging, tables, provenance) {
            if let Err(cleanup) = remove_path(&staging) {
                warn!(
                    path = %staging.display(),
                    error = %cleanup,
                    "Failed to remove partial observation store"
                );
            }
            return Err(e);
        }

        remove_path(path)?;
        std::fs::rename(&staging, path)?;

        info!(
            path = %path.display(),
            fields = ?tables.iter().map(|t| t.kind.as_str()).collect::<Vec<_>>(),
            records = tables.iter().map(|t| t.len()).sum::<usize>(),
            "Wrote observation store"
        );
        Ok(())
    }

    fn write_store(
        &self,
        dir: &Path,
        tables: &[ObservationTable],
        provenance: &Provenance,
    ) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let store = Arc::new(Store::new(dir).map_err(write_err)?);

        let fields: Vec<&str> = tables.iter().map(|t| t.kind.as_str()).collect();
        let mut attrs = Map::new();
        attrs.insert("history".to_string(), json!(provenance.history()));
        attrs.insert("created".to_string(), json!(provenance.created.to_rfc3339()));
        attrs.insert("version".to_string(), json!(provenance.version));
        if let Some(source) = &provenance.source_volume {
            attrs.insert("source_volume".to_string(), json!(source));
        }
        attrs.insert("fields".to_string(), json!(fields));

        GroupBuilder::new()
            .attributes(attrs)
            .build(store.clone(), "/")
            .map_err(write_err)?
            .store_metadata()
            .map_err(write_err)?;

        for table in tables {
            self.write_table(&store, table)?;
        }
        Ok(())
    }

    fn write_table(&self, store: &Arc<Store>, table: &ObservationTable) -> Result<()> {
        let group_path = format!("/{}", table.kind.as_str());
        let n = table.len();

        let mut attrs = Map::new();
        attrs.insert("count".to_string(), json!(n));
        attrs.insert("units".to_string(), json!(table.kind.units()));
        GroupBuilder::new()
            .attributes(attrs)
            .build(store.clone(), &group_path)
            .map_err(write_err)?
            .store_metadata()
            .map_err(write_err)?;

        if n == 0 {
            debug!(kind = %table.kind, "Empty table, no columns written");
            return Ok(());
        }

        for spec in COLUMNS {
            let data = column_data(spec, &table.records);
            let units = if spec.name == "value" {
                table.kind.units()
            } else {
                spec.units
            };
            self.write_column(store, &format!("{}/{}", group_path, spec.name), spec, units, n, &data)?;
        }
        Ok(())
    }

    fn write_column(
        &self,
        store: &Arc<Store>,
        path: &str,
        spec: &ColumnSpec,
        units: &str,
        n: usize,
        data: &ColumnData,
    ) -> Result<()> {
        let rows = n as u64;
        let chunk = self.chunk_size.min(n) as u64;
        let width = DART_DATE_LEN as u64;

        let (shape, chunk_shape, dims) = match spec.ty {
            ColumnType::Chars => (vec![rows, width], vec![chunk, width], json!(["index", "nchars"])),
            _ => (vec![rows], vec![chunk], json!(["index"])),
        };
        let (data_type, fill_value) = match spec.ty {
            ColumnType::F32 => (DataType::Float32, FillValue::from(f32::NAN)),
            ColumnType::F64 => (DataType::Float64, FillValue::from(f64::NAN)),
            ColumnType::I64 => (DataType::Int64, FillValue::from(0i64)),
            ColumnType::Chars => (DataType::UInt8, FillValue::from(0u8)),
        };

        let mut attrs = Map::new();
        attrs.insert("units".to_string(), json!(units));
        attrs.insert("description".to_string(), json!(spec.description));
        attrs.insert("_ARRAY_DIMENSIONS".to_string(), dims);

        let chunk_grid: zarrs::array::ChunkGrid = chunk_shape
            .try_into()
            .map_err(|e| ObsSeqError::serialization(format!("{:?}", e)))?;

        let array = ArrayBuilder::new(shape.clone(), data_type, chunk_grid, fill_value)
            .attributes(attrs)
            .build(store.clone(), path)
            .map_err(write_err)?;
        array.store_metadata().map_err(write_err)?;

        let subset =
            ArraySubset::new_with_start_shape(vec![0; shape.len()], shape).map_err(write_err)?;
        match data {
            ColumnData::F32(v) => array.store_array_subset_elements(&subset, v),
            ColumnData::F64(v) => array.store_array_subset_elements(&subset, v),
            ColumnData::I64(v) => array.store_array_subset_elements(&subset, v),
            ColumnData::Chars(v) => array.store_array_subset_elements(&subset, v),
        }
        .map_err(write_err)
    }
}

/// Reads observation tables back from a store written by [`ZarrTableWriter`].
#[derive(Clone)]
pub struct ZarrTableReader {
    store: Arc<Store>,
}

impl ZarrTableReader {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(ObsSeqError::read_failed(format!(
                "{} is not a Zarr store",
                path.display()
            )));
        }
        let store = Arc::new(Store::new(path).map_err(read_err)?);
        Ok(Self { store })
    }

    /// Convenience for `open(path)?.read_table(kind)`.
    pub fn read(path: &Path, kind: FieldKind) -> Result<ObservationTable> {
        Self::open(path)?.read_table(kind)
    }

    fn root_attrs(&self) -> Result<Map<String, Value>> {
        let group = Group::open(self.store.clone(), "/").map_err(read_err)?;
        Ok(group.attributes().clone())
    }

    /// Field kinds present in the store.
    pub fn kinds(&self) -> Result<Vec<FieldKind>> {
        let attrs = self.root_attrs()?;
        let fields = attrs
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| ObsSeqError::invalid_table("root group has no field list"))?;
        fields
            .iter()
            .map(|v| {
                v.as_str()
                    .and_then(FieldKind::from_str)
                    .ok_or_else(|| ObsSeqError::invalid_table(format!("unknown field {}", v)))
            })
            .collect()
    }

    /// Provenance attributes of the store.
    pub fn provenance(&self) -> Result<Provenance> {
        let attrs = self.root_attrs()?;
        let created = attrs
            .get("created")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .ok_or_else(|| ObsSeqError::invalid_table("missing creation time"))?;
        let version = attrs
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let source_volume = attrs
            .get("source_volume")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Provenance {
            created,
            version,
            source_volume,
        })
    }

    /// Read the table of one field kind.
    pub fn read_table(&self, kind: FieldKind) -> Result<ObservationTable> {
        let group_path = format!("/{}", kind.as_str());
        let group = Group::open(self.store.clone(), &group_path).map_err(read_err)?;
        let n = group
            .attributes()
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| ObsSeqError::invalid_table(format!("{} has no count", group_path)))?
            as usize;
        if n == 0 {
            return Ok(ObservationTable::empty(kind));
        }

        let mut columns = Vec::with_capacity(COLUMNS.len());
        for spec in COLUMNS {
            let data = self.read_column(&format!("{}/{}", group_path, spec.name), spec)?;
            let len = match &data {
                ColumnData::F32(v) => v.len(),
                ColumnData::F64(v) => v.len(),
                ColumnData::I64(v) => v.len(),
                ColumnData::Chars(v) => v.len() / DART_DATE_LEN,
            };
            if len != n {
                return Err(ObsSeqError::invalid_table(format!(
                    "column {} has {} rows, expected {}",
                    spec.name, len, n
                )));
            }
            columns.push(data);
        }

        let records = (0..n).map(|row| record_at(&columns, row)).collect();
        Ok(ObservationTable::new(kind, records))
    }

    fn read_column(&self, path: &str, spec: &ColumnSpec) -> Result<ColumnData> {
        let array = Array::open(self.store.clone(), path).map_err(read_err)?;
        let shape = array.shape().to_vec();
        let subset =
            ArraySubset::new_with_start_shape(vec![0; shape.len()], shape).map_err(read_err)?;

        let data = match spec.ty {
            ColumnType::F32 => ColumnData::F32(
                array
                    .retrieve_array_subset_elements::<f32>(&subset)
                    .map_err(read_err)?,
            ),
            ColumnType::F64 => ColumnData::F64(
                array
                    .retrieve_array_subset_elements::<f64>(&subset)
                    .map_err(read_err)?,
            ),
            ColumnType::I64 => ColumnData::I64(
                array
                    .retrieve_array_subset_elements::<i64>(&subset)
                    .map_err(read_err)?,
            ),
            ColumnType::Chars => ColumnData::Chars(
                array
                    .retrieve_array_subset_elements::<u8>(&subset)
                    .map_err(read_err)?,
            ),
        };
        Ok(data)
    }
}

fn record_at(columns: &[ColumnData], row: usize) -> ObservationRecord {
    let f32_at = |c: usize| match &columns[c] {
        ColumnData::F32(v) => v[row],
        _ => f32::NAN,
    };
    let f64_at = |c: usize| match &columns[c] {
        ColumnData::F64(v) => v[row],
        _ => f64::NAN,
    };
    let i64_at = |c: usize| match &columns[c] {
        ColumnData::I64(v) => v[row],
        _ => 0,
    };
    let date = match &columns[6] {
        ColumnData::Chars(v) => {
            let chars = &v[row * DART_DATE_LEN..(row + 1) * DART_DATE_LEN];
            String::from_utf8_lossy(chars).trim_end().to_string()
        }
        _ => String::new(),
    };

    ObservationRecord {
        value: f32_at(0),
        lat: f64_at(1),
        lon: f64_at(2),
        height: f64_at(3),
        error_var: f32_at(4),
        utime: f64_at(5),
        date,
        day: i64_at(7),
        second: i64_at(8),
        platform_lat: f64_at(9),
        platform_lon: f64_at(10),
        platform_hgt: f64_at(11),
        platform_dir1: f64_at(12),
        platform_dir2: f64_at(13),
        platform_dir3: f64_at(14),
        platform_nyquist: f32_at(15),
    }
}
