//! Observation sequences from gridded radar fields.
//!
//! [`ObservationSerializer`] flattens masked [`superob::GriddedField`]s into
//! [`ObservationTable`]s, and [`ZarrTableWriter`] persists them as one Zarr
//! V3 store per volume. Stores from several volumes can be merged with
//! [`combine_tables`].

pub mod combine;
pub mod config;
pub mod error;
pub mod exchange;
pub mod record;
pub mod serializer;
pub mod zarr;

use chrono::{DateTime, Utc};

pub use combine::{combine_tables, find_stores, CombineReport};
pub use config::{ObsErrorTable, SerializationConfig};
pub use error::{ObsSeqError, Result};
pub use exchange::{ExchangeWriter, NoExchange};
pub use record::{ObservationRecord, ObservationTable, Provenance};
pub use serializer::{direction_cosines, ObservationSerializer};
pub use zarr::{ColumnSpec, ZarrTableReader, ZarrTableWriter, COLUMNS};

/// Output store name, e.g. `obs_seq_KTLX_VR_20230510_2130.zarr`.
pub fn output_file_name(radar: &str, time: &DateTime<Utc>) -> String {
    format!(
        "obs_seq_{}_VR_{}.zarr",
        radar,
        radar_common::analysis_stamp(time)
    )
}
