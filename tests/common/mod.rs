//! Synthetic scene catalog over the default south-east Australia region

#![allow(dead_code)]

use bushfire_atmos::backend::{CollectionData, MemoryBackend, Scene};
use bushfire_atmos::constants::{
    AER_AI_BAND, CLOUD_COVER_PROPERTY, CO_BAND, FRP_BAND, LANDSAT8_SR_COLLECTION,
    MODIS_FIRE_COLLECTION, NO2_BAND, S5P_AER_AI_COLLECTION, S5P_CO_COLLECTION,
    S5P_NO2_COLLECTION,
};
use bushfire_atmos::raster::GridSpec;
use chrono::NaiveDate;
use std::path::Path;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Half-degree grid spanning lon 146..152, lat -38.5..-33
pub fn grid() -> GridSpec {
    GridSpec {
        west: 146.0,
        north: -33.0,
        cell_size: 0.5,
        width: 12,
        height: 11,
    }
}

pub fn constant(value: f64) -> Vec<Option<f64>> {
    vec![Some(value); grid().len()]
}

/// CO column for a month: 0.03 mol/m^2 plus a small seasonal step
pub fn co_value(month: u32) -> f64 {
    0.03 + month as f64 * 0.001
}

pub struct CatalogOptions {
    /// Months with no CO scene
    pub co_gaps: Vec<(i32, u32)>,
    pub include_aerosol: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            co_gaps: vec![(2020, 3)],
            include_aerosol: true,
        }
    }
}

fn monthly(id: &str, band: &str, gaps: &[(i32, u32)], value: impl Fn(u32) -> f64) -> CollectionData {
    let mut collection = CollectionData::new(id, grid());
    for year in [2019, 2020] {
        for month in 1..=12 {
            if gaps.contains(&(year, month)) {
                continue;
            }
            collection = collection
                .with_scene(Scene::new(date(year, month, 10)).with_band(band, constant(value(month))));
        }
    }
    collection
}

/// Fire radiative power: hot cells along the eastern edge, zero elsewhere
fn fire_cells(peak: f64) -> Vec<Option<f64>> {
    let grid = grid();
    (0..grid.len())
        .map(|i| {
            let col = i % grid.width;
            Some(if col >= 8 { peak } else { 0.0 })
        })
        .collect()
}

pub fn collections(options: &CatalogOptions) -> Vec<CollectionData> {
    let co = monthly(S5P_CO_COLLECTION, CO_BAND, &options.co_gaps, co_value);
    let no2 = monthly(S5P_NO2_COLLECTION, NO2_BAND, &[], |_| 0.00005);

    let mut aerosol = CollectionData::new(S5P_AER_AI_COLLECTION, grid());
    if options.include_aerosol {
        aerosol = aerosol
            .with_scene(Scene::new(date(2019, 12, 5)).with_band(AER_AI_BAND, constant(0.5)))
            .with_scene(Scene::new(date(2019, 12, 28)).with_band(AER_AI_BAND, constant(1.5)));
    } else {
        aerosol = aerosol
            .with_scene(Scene::new(date(2019, 6, 5)).with_band(AER_AI_BAND, constant(0.1)));
    }

    let landsat_scene = |day: u32, cloud: f64, dn: f64| {
        Scene::new(date(2019, 12, day))
            .with_property(CLOUD_COVER_PROPERTY, cloud)
            .with_band("SR_B2", constant(dn))
            .with_band("SR_B3", constant(dn))
            .with_band("SR_B4", constant(dn))
            .with_band("ST_B10", constant(30000.0))
    };
    let landsat = CollectionData::new(LANDSAT8_SR_COLLECTION, grid())
        .with_scene(landsat_scene(20, 10.0, 20000.0))
        .with_scene(landsat_scene(27, 75.0, 45000.0));

    let fire = CollectionData::new(MODIS_FIRE_COLLECTION, grid())
        .with_scene(Scene::new(date(2019, 12, 21)).with_band(FRP_BAND, fire_cells(120.0)))
        .with_scene(Scene::new(date(2020, 1, 4)).with_band(FRP_BAND, fire_cells(340.0)));

    vec![co, no2, aerosol, landsat, fire]
}

pub fn synthetic_backend(options: &CatalogOptions) -> MemoryBackend {
    let mut backend = MemoryBackend::new();
    for collection in collections(options) {
        backend.insert(collection).unwrap();
    }
    backend
}

/// Write each collection as `<n>.json` into `dir`
pub fn write_catalog(dir: &Path, options: &CatalogOptions) {
    for (i, collection) in collections(options).iter().enumerate() {
        std::fs::write(
            dir.join(format!("collection_{}.json", i)),
            serde_json::to_string(collection).unwrap(),
        )
        .unwrap();
    }
}
