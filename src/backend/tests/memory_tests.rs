//! Tests for the in-memory backend

use super::{constant_cells, date, test_grid, test_region};
use crate::backend::{
    Backend, CollectionData, MemoryBackend, PropertyFilter, QueryResult, Scene, SpatialParams,
    query,
};
use crate::error::AnalysisError;
use crate::models::{ReducerKind, Region, TimeWindow};
use crate::raster::LinearRescale;
use std::fs;
use tempfile::TempDir;

fn params() -> SpatialParams {
    SpatialParams {
        reducer: ReducerKind::Mean,
        scale_m: 111_320.0,
        max_pixels: 1_000_000,
        best_effort: true,
    }
}

fn january() -> TimeWindow {
    TimeWindow::new(date(2020, 1, 1), date(2020, 2, 1)).unwrap()
}

fn gas_backend() -> MemoryBackend {
    let collection = CollectionData::new("TEST/GAS", test_grid())
        .with_scene(Scene::new(date(2020, 1, 5)).with_band("gas", constant_cells(1.0)))
        .with_scene(Scene::new(date(2020, 1, 20)).with_band("gas", constant_cells(3.0)))
        .with_scene(Scene::new(date(2020, 2, 3)).with_band("gas", constant_cells(100.0)));
    MemoryBackend::new().with_collection(collection).unwrap()
}

#[tokio::test]
async fn test_spatial_mean_of_temporal_mean() {
    let backend = gas_backend();
    let spec = query("TEST/GAS", &test_region(), january()).reduce_spatial(
        "gas",
        ReducerKind::Mean,
        params(),
    );

    let result = backend.execute(&spec).await.unwrap();
    assert_eq!(result, QueryResult::Scalar(Some(2.0)));
}

#[tokio::test]
async fn test_window_without_scenes_yields_none() {
    let backend = gas_backend();
    let march = TimeWindow::new(date(2020, 3, 1), date(2020, 4, 1)).unwrap();
    let spec = query("TEST/GAS", &test_region(), march).reduce_spatial(
        "gas",
        ReducerKind::Mean,
        params(),
    );

    let result = backend.execute(&spec).await.unwrap();
    assert_eq!(result, QueryResult::Scalar(None));
}

#[tokio::test]
async fn test_region_outside_grid_yields_none() {
    let backend = gas_backend();
    let far_away =
        Region::polygon(&[(50.0, 50.0), (51.0, 50.0), (51.0, 51.0), (50.0, 51.0)]).unwrap();
    let spec = query("TEST/GAS", &far_away, january()).reduce_temporal(
        vec!["gas".to_string()],
        ReducerKind::Mean,
    );

    let result = backend.execute(&spec).await.unwrap();
    assert_eq!(result, QueryResult::Raster(None));
}

#[tokio::test]
async fn test_property_filter_excludes_cloudy_scenes() {
    let collection = CollectionData::new("TEST/SR", test_grid())
        .with_scene(
            Scene::new(date(2020, 1, 2))
                .with_property("CLOUD_COVER", 10.0)
                .with_band("b", constant_cells(0.2)),
        )
        .with_scene(
            Scene::new(date(2020, 1, 9))
                .with_property("CLOUD_COVER", 85.0)
                .with_band("b", constant_cells(0.9)),
        )
        .with_scene(Scene::new(date(2020, 1, 16)).with_band("b", constant_cells(0.9)));
    let backend = MemoryBackend::new().with_collection(collection).unwrap();

    let spec = query("TEST/SR", &test_region(), january())
        .with_filter(PropertyFilter::less_than("CLOUD_COVER", 30.0))
        .reduce_temporal(vec!["b".to_string()], ReducerKind::Mean);

    let raster = backend
        .execute(&spec)
        .await
        .unwrap()
        .into_raster("TEST/SR")
        .unwrap()
        .unwrap();
    let stats = raster.stats("b").unwrap();
    assert_eq!(stats.min, Some(0.2));
    assert_eq!(stats.max, Some(0.2));
}

#[tokio::test]
async fn test_rescale_applied_before_compositing() {
    let collection = CollectionData::new("TEST/DN", test_grid())
        .with_scene(Scene::new(date(2020, 1, 2)).with_band("dn", constant_cells(20000.0)))
        .with_scene(Scene::new(date(2020, 1, 3)).with_band("dn", constant_cells(20000.0)));
    let backend = MemoryBackend::new().with_collection(collection).unwrap();

    let spec = query("TEST/DN", &test_region(), january())
        .rescale(vec!["dn".to_string()], LinearRescale::new(0.0000275, -0.2))
        .reduce_temporal(vec!["dn".to_string()], ReducerKind::Max);

    let raster = backend
        .execute(&spec)
        .await
        .unwrap()
        .into_raster("TEST/DN")
        .unwrap()
        .unwrap();
    for cell in raster.band("dn").unwrap().iter().flatten() {
        assert!((cell - 0.35).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_unknown_collection_and_missing_band() {
    let backend = gas_backend();

    let spec = query("TEST/NOPE", &test_region(), january())
        .reduce_temporal(vec!["gas".to_string()], ReducerKind::Mean);
    assert!(matches!(
        backend.execute(&spec).await,
        Err(AnalysisError::Backend { .. })
    ));

    let spec = query("TEST/GAS", &test_region(), january())
        .reduce_temporal(vec!["other".to_string()], ReducerKind::Mean);
    assert!(matches!(
        backend.execute(&spec).await,
        Err(AnalysisError::UnsupportedBand { .. })
    ));
}

#[test]
fn test_insert_rejects_mismatched_cells() {
    let collection = CollectionData::new("TEST/BAD", test_grid())
        .with_scene(Scene::new(date(2020, 1, 1)).with_band("gas", vec![Some(1.0); 3]));
    assert!(MemoryBackend::new().with_collection(collection).is_err());
}

#[test]
fn test_load_catalog_from_directory() {
    let temp_dir = TempDir::new().unwrap();
    let collection = CollectionData::new("TEST/GAS", test_grid())
        .with_scene(Scene::new(date(2020, 1, 5)).with_band("gas", constant_cells(1.0)));
    fs::write(
        temp_dir.path().join("gas.json"),
        serde_json::to_string(&collection).unwrap(),
    )
    .unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

    let backend = MemoryBackend::load_catalog(temp_dir.path()).unwrap();
    let loaded = backend.collection("TEST/GAS").unwrap();
    assert_eq!(loaded, &collection);
    assert_eq!(
        loaded.date_range(),
        Some((date(2020, 1, 5), date(2020, 1, 5)))
    );
}

#[test]
fn test_load_catalog_errors() {
    let temp_dir = TempDir::new().unwrap();
    assert!(matches!(
        MemoryBackend::load_catalog(temp_dir.path()),
        Err(AnalysisError::Catalog { .. })
    ));

    fs::write(temp_dir.path().join("broken.json"), "{ not json").unwrap();
    assert!(matches!(
        MemoryBackend::load_catalog(temp_dir.path()),
        Err(AnalysisError::Catalog { .. })
    ));

    assert!(matches!(
        MemoryBackend::load_catalog(&temp_dir.path().join("missing")),
        Err(AnalysisError::Catalog { .. })
    ));
}
