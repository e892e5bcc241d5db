//! Integration tests: grid synthetic radar volumes with the analysis kernel.

use radar_common::{FieldKind, GeoPoint, MISSING};
use superob::{
    AnalysisGrid, AnalysisGridSpec, GridReference, ObjectiveAnalysis, SuperobError, WeightMethod,
};
use test_utils::{
    masked_field, single_gate_volume, sites, small_grid_spec, synthetic_volume, volume_time,
};

#[test]
fn test_single_gate_at_origin_reproduced_exactly() {
    let spec = AnalysisGridSpec {
        min_count: 1,
        ..small_grid_spec()
    };
    let volume = single_gate_volume(sites::KTLX, volume_time(), 0.0, 0.0, "reflectivity", 42.0);
    let grid = AnalysisGrid::new(&spec, &volume.site).unwrap();
    let kernel = ObjectiveAnalysis::new(&spec, &grid);

    let field = kernel
        .grid_field(&volume, "reflectivity", FieldKind::Reflectivity)
        .unwrap();

    assert_eq!(field.shape(), (1, 21, 21));
    assert!(!field.mask[[0, 10, 10]]);
    assert_eq!(field.data[[0, 10, 10]], 42.0);
    assert_eq!(field.height[[0, 10, 10]], 0.0);
    assert!(field.mask[[0, 0, 0]]);
    assert_eq!(field.data[[0, 0, 0]], MISSING);
}

#[test]
fn test_too_few_gates_always_masked() {
    // One gate carries full weight but min_count is 3
    let spec = small_grid_spec();
    let volume = single_gate_volume(sites::KTLX, volume_time(), 0.0, 0.0, "reflectivity", 42.0);
    let grid = AnalysisGrid::new(&spec, &volume.site).unwrap();
    let kernel = ObjectiveAnalysis::new(&spec, &grid);

    let field = kernel
        .grid_field(&volume, "reflectivity", FieldKind::Reflectivity)
        .unwrap();
    assert_eq!(field.valid_count(), 0);
    assert!(field.data.iter().all(|v| *v == MISSING));
}

#[test]
fn test_sorted_search_matches_brute_force() {
    let volume = synthetic_volume(sites::KTLX, volume_time(), &[0.5, 3.0], 180, 120, 250.0);

    let reference = GridReference::new(GeoPoint::new(35.25, -97.1), 60_000.0, 45_000.0);
    let specs = [
        small_grid_spec(),
        AnalysisGridSpec {
            method: WeightMethod::Barnes,
            roi: 2000.0,
            ..small_grid_spec()
        },
        AnalysisGridSpec {
            method: WeightMethod::GaspariCohn,
            reference: Some(reference),
            ..small_grid_spec()
        },
    ];

    for spec in &specs {
        let grid = AnalysisGrid::new(spec, &volume.site).unwrap();
        let kernel = ObjectiveAnalysis::new(spec, &grid);

        for sweep in &volume.sweeps {
            let gates = kernel.planar_gates(sweep, "reflectivity");
            assert!(!gates.is_empty());

            let fast = kernel.analyse_gates(&gates);
            let slow = kernel.analyse_gates_brute_force(&gates);

            assert_eq!(fast.accepted, slow.accepted, "{} acceptance differs", spec.method);
            assert_eq!(fast.value, slow.value, "{} values differ", spec.method);
            assert_eq!(fast.height, slow.height, "{} heights differ", spec.method);
        }
    }
}

#[test]
fn test_storm_is_gridded_with_heights() {
    let spec = small_grid_spec();
    let volume = synthetic_volume(sites::KTLX, volume_time(), &[0.5, 3.0], 360, 120, 250.0);
    let grid = AnalysisGrid::new(&spec, &volume.site).unwrap();
    let kernel = ObjectiveAnalysis::new(&spec, &grid);

    let field = kernel
        .grid_field(&volume, "reflectivity", FieldKind::Reflectivity)
        .unwrap();

    // Storm centre is at (12 km, 12 km): column 14, row 14
    assert!(!field.mask[[0, 14, 14]]);
    assert!(field.data[[0, 14, 14]] > 30.0, "got {}", field.data[[0, 14, 14]]);
    assert!(field.data[[0, 10, 0]] < 10.0);

    // Higher elevation sits higher above the radar
    assert!(field.height[[1, 14, 14]] > field.height[[0, 14, 14]]);
    assert!(field.height[[1, 14, 14]] > 500.0);

    assert_eq!(field.elevations, vec![0.5, 3.0]);
    assert_eq!(field.nyquist, vec![25.0, 25.0]);
    assert_eq!(field.units, "dBZ");
}

#[test]
fn test_sweep_without_valid_gates_is_fully_masked() {
    let spec = small_grid_spec();
    let mut volume = synthetic_volume(sites::KTLX, volume_time(), &[0.5, 1.5], 90, 120, 250.0);
    let (rays, gates) = (volume.sweeps[1].n_rays(), volume.sweeps[1].n_gates());
    volume.sweeps[1]
        .fields
        .insert("reflectivity".to_string(), masked_field(rays, gates));

    let grid = AnalysisGrid::new(&spec, &volume.site).unwrap();
    let field = ObjectiveAnalysis::new(&spec, &grid)
        .grid_field(&volume, "reflectivity", FieldKind::Reflectivity)
        .unwrap();

    assert!(field.level_valid_count(0) > 0);
    assert_eq!(field.level_valid_count(1), 0);
}

#[test]
fn test_range_window_excludes_gates() {
    let spec = AnalysisGridSpec {
        min_range: 20_000.0,
        max_range: 25_000.0,
        ..small_grid_spec()
    };
    let volume = synthetic_volume(sites::KTLX, volume_time(), &[0.5], 180, 120, 250.0);
    let grid = AnalysisGrid::new(&spec, &volume.site).unwrap();
    let kernel = ObjectiveAnalysis::new(&spec, &grid);

    let gates = kernel.planar_gates(&volume.sweeps[0], "reflectivity");
    assert!(gates.iter().all(|g| {
        let r = g.x.hypot(g.y);
        (20_000.0..=25_000.0).contains(&r)
    }));

    let field = kernel
        .grid_field(&volume, "reflectivity", FieldKind::Reflectivity)
        .unwrap();
    // Radar location is far from every remaining gate
    assert!(field.mask[[0, 10, 10]]);
}

#[test]
fn test_missing_field_is_an_error() {
    let spec = small_grid_spec();
    let volume = synthetic_volume(sites::KTLX, volume_time(), &[0.5], 36, 10, 250.0);
    let grid = AnalysisGrid::new(&spec, &volume.site).unwrap();

    let result = ObjectiveAnalysis::new(&spec, &grid).grid_field(
        &volume,
        "differential_reflectivity",
        FieldKind::Reflectivity,
    );
    assert!(matches!(result, Err(SuperobError::MissingField(_))));
}
