//! Flattening of masked gridded fields into observation records.

use radar_common::{date_string, unix_seconds, DartTime, FieldKind};
use superob::GriddedField;
use tracing::{debug, info};

use crate::config::SerializationConfig;
use crate::record::{ObservationRecord, ObservationTable};

/// Unit vector from the radar to a point offset `(dx, dy, dh)` meters.
///
/// Returns straight up when the point coincides with the radar.
pub fn direction_cosines(dx: f64, dy: f64, dh: f64) -> (f64, f64, f64) {
    let slant = (dx * dx + dy * dy + dh * dh).sqrt();
    if slant > 0.0 {
        (dx / slant, dy / slant, dh / slant)
    } else {
        (0.0, 0.0, 1.0)
    }
}

/// Time columns shared by every record of one volume.
struct TimeColumns {
    utime: f64,
    date: String,
    dart: DartTime,
}

impl TimeColumns {
    fn of(field: &GriddedField) -> Self {
        Self {
            utime: unix_seconds(&field.volume_time),
            date: date_string(&field.volume_time),
            dart: DartTime::from_datetime(&field.volume_time),
        }
    }
}

/// Turns masked gridded fields into observation tables.
#[derive(Debug, Clone, Default)]
pub struct ObservationSerializer {
    config: SerializationConfig,
}

impl ObservationSerializer {
    pub fn new(config: SerializationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SerializationConfig {
        &self.config
    }

    /// One record per unmasked cell, in (sweep, y, x) order.
    pub fn serialize(&self, field: &GriddedField) -> ObservationTable {
        let (nz, ny, nx) = field.shape();
        let error_var = self.config.errors.variance(field.kind);
        let times = TimeColumns::of(field);

        let mut records = Vec::with_capacity(field.valid_count());
        for k in 0..nz {
            let nyquist = field.nyquist.get(k).copied().unwrap_or(0.0);
            for j in 0..ny {
                for i in 0..nx {
                    if field.mask[[k, j, i]] {
                        continue;
                    }
                    let h = f64::from(field.height[[k, j, i]]);
                    records.push(self.record(
                        field,
                        field.data[[k, j, i]],
                        (i, j),
                        h,
                        error_var,
                        nyquist,
                        &times,
                    ));
                }
            }
        }

        info!(
            field = %field.name,
            kind = %field.kind,
            records = records.len(),
            "Serialized gridded field"
        );
        ObservationTable::new(field.kind, records)
    }

    /// Records for the synthetic zero-echo layer attached by QC, if any.
    ///
    /// The layer sits at its configured height above the radar and takes
    /// the Nyquist velocity of the lowest sweep.
    pub fn serialize_zero_layer(&self, field: &GriddedField) -> ObservationTable {
        let kind = FieldKind::ZeroReflectivity;
        let Some(layer) = field.zero_layer.as_ref() else {
            debug!(field = %field.name, "No zero-echo layer to serialize");
            return ObservationTable::empty(kind);
        };

        let (ny, nx) = layer.data.dim();
        let error_var = self.config.errors.variance(kind);
        let nyquist = field.nyquist.first().copied().unwrap_or(0.0);
        let times = TimeColumns::of(field);
        let h = f64::from(layer.height);

        let mut records = Vec::with_capacity(layer.valid_count());
        for j in 0..ny {
            for i in 0..nx {
                if layer.mask[[j, i]] {
                    continue;
                }
                records.push(self.record(
                    field,
                    layer.data[[j, i]],
                    (i, j),
                    h,
                    error_var,
                    nyquist,
                    &times,
                ));
            }
        }

        info!(records = records.len(), "Serialized zero-echo layer");
        ObservationTable::new(kind, records)
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        field: &GriddedField,
        value: f32,
        (i, j): (usize, usize),
        height_above_radar: f64,
        error_var: f32,
        nyquist: f32,
        times: &TimeColumns,
    ) -> ObservationRecord {
        let (dx, dy) = field.offset_from_radar(i, j);
        let (dir1, dir2, dir3) = direction_cosines(dx, dy, height_above_radar);

        ObservationRecord {
            value,
            lat: field.lat[[j, i]],
            lon: field.lon[[j, i]],
            height: height_above_radar + field.site.alt,
            error_var,
            utime: times.utime,
            date: times.date.clone(),
            day: times.dart.days,
            second: times.dart.seconds,
            platform_lat: field.site.lat,
            platform_lon: field.site.lon,
            platform_hgt: field.site.alt,
            platform_dir1: dir1,
            platform_dir2: dir2,
            platform_dir3: dir3,
            platform_nyquist: nyquist,
        }
    }
}
