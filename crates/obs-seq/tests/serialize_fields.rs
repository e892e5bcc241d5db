//! Integration tests: flatten masked gridded fields into observation records.

use ndarray::{Array2, Array3};
use obs_seq::{ObsErrorTable, ObservationSerializer, SerializationConfig};
use radar_common::{FieldKind, MISSING};
use superob::ZeroEchoLayer;
use test_utils::{assert_approx_eq, gridded_field, sites, volume_time};

fn two_level_field(kind: FieldKind) -> superob::GriddedField {
    let mut analysis = Array3::from_elem((2, 3, 3), 30.0f32);
    analysis
        .index_axis_mut(ndarray::Axis(0), 1)
        .fill(MISSING);
    gridded_field(kind, analysis, sites::KTLX, volume_time())
}

#[test]
fn test_one_valid_sweep_gives_nine_records() {
    let field = two_level_field(FieldKind::Reflectivity);
    let table = ObservationSerializer::default().serialize(&field);

    assert_eq!(table.kind, FieldKind::Reflectivity);
    assert_eq!(table.len(), 9);
    for record in &table.records {
        assert_eq!(record.value, 30.0);
        assert_eq!(record.error_var, 25.0);
        assert_eq!(record.platform_nyquist, 25.0);
        assert_eq!(record.date, "2023-05-10_21:30:12");
        assert_approx_eq!(record.direction_norm(), 1.0, 1e-12);
    }
}

#[test]
fn test_records_follow_grid_order_and_geometry() {
    let field = two_level_field(FieldKind::Velocity);
    let table = ObservationSerializer::default().serialize(&field);

    // (y, x) = (0, 0) sits on the radar
    let first = &table.records[0];
    assert_eq!(first.lat, field.lat[[0, 0]]);
    assert_eq!(first.lon, field.lon[[0, 0]]);
    assert_eq!(
        (first.platform_dir1, first.platform_dir2, first.platform_dir3),
        (0.0, 0.0, 1.0)
    );
    assert_approx_eq!(first.height, 1000.0 + sites::KTLX.alt, 1e-9);
    assert_eq!(first.error_var, 9.0);

    // Second record is one column east
    let second = &table.records[1];
    assert_eq!(second.lon, field.lon[[0, 1]]);
    assert!(second.platform_dir1 > 0.9);
    assert_eq!(second.platform_dir2, 0.0);

    // Fourth record starts the next row north
    assert_eq!(table.records[3].lat, field.lat[[1, 0]]);
    assert!(table.records[3].platform_dir2 > 0.9);
}

#[test]
fn test_record_count_matches_unmasked_cells() {
    let mut analysis = Array3::from_shape_fn((3, 4, 5), |(k, j, i)| (k + j + i) as f32);
    analysis[[0, 0, 0]] = MISSING;
    analysis[[2, 3, 4]] = MISSING;
    let mut field = gridded_field(FieldKind::Reflectivity, analysis, sites::KTLX, volume_time());
    field.set_masked([1, 2, 2]);

    let table = ObservationSerializer::default().serialize(&field);
    assert_eq!(table.len(), field.valid_count());
    assert_eq!(table.len(), 3 * 4 * 5 - 3);
    assert!(table.records.iter().all(|r| r.value != MISSING));
}

#[test]
fn test_serialization_is_deterministic() {
    let field = two_level_field(FieldKind::Reflectivity);
    let serializer = ObservationSerializer::default();
    assert_eq!(serializer.serialize(&field), serializer.serialize(&field));
}

#[test]
fn test_fully_masked_field_gives_no_records() {
    let field = gridded_field(
        FieldKind::Velocity,
        Array3::from_elem((2, 3, 3), MISSING),
        sites::KTLX,
        volume_time(),
    );
    let table = ObservationSerializer::default().serialize(&field);
    assert!(table.is_empty());
}

#[test]
fn test_configured_error_is_squared() {
    let config = SerializationConfig {
        errors: ObsErrorTable {
            reflectivity: 2.5,
            ..Default::default()
        },
        ..Default::default()
    };
    let table = ObservationSerializer::new(config).serialize(&two_level_field(FieldKind::Reflectivity));
    assert!(table.records.iter().all(|r| r.error_var == 6.25));
}

#[test]
fn test_zero_layer_records() {
    let mut field = two_level_field(FieldKind::Reflectivity);
    let serializer = ObservationSerializer::default();
    assert!(serializer.serialize_zero_layer(&field).is_empty());

    let mut mask = Array2::from_elem((3, 3), true);
    mask[[0, 2]] = false;
    mask[[2, 2]] = false;
    field.zero_layer = Some(ZeroEchoLayer {
        data: Array2::zeros((3, 3)),
        mask,
        height: 6000.0,
        composite: Array2::zeros((3, 3)),
    });

    let table = serializer.serialize_zero_layer(&field);
    assert_eq!(table.kind, FieldKind::ZeroReflectivity);
    assert_eq!(table.len(), 2);
    for record in &table.records {
        assert_eq!(record.value, 0.0);
        assert_eq!(record.error_var, 25.0);
        assert_approx_eq!(record.height, 6000.0 + sites::KTLX.alt, 1e-9);
        assert_approx_eq!(record.direction_norm(), 1.0, 1e-12);
    }
    assert_eq!(table.records[0].lon, field.lon[[0, 2]]);
}
