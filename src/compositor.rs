//! Period composites for map layers
//!
//! A composite filters a collection to the region and a short window, reduces the
//! stack pixel-wise with a temporal reducer and clips the result to the region.
//! Band contracts are checked against the catalog before the backend is touched.

use crate::backend::{Backend, PropertyFilter, QuerySpec, query};
use crate::catalog::Catalog;
use crate::constants::DEFAULT_CLOUD_COVER_MAX;
use crate::error::{AnalysisError, Result};
use crate::models::{RasterComposite, ReducerKind, Region, TimeWindow};
use crate::raster::LinearRescale;
use std::sync::Arc;
use tracing::{debug, info};

pub struct PeriodCompositor {
    backend: Arc<dyn Backend>,
    catalog: Arc<Catalog>,
    cloud_cover_max: f64,
}

impl PeriodCompositor {
    pub fn new(backend: Arc<dyn Backend>, catalog: Arc<Catalog>) -> Self {
        Self {
            backend,
            catalog,
            cloud_cover_max: DEFAULT_CLOUD_COVER_MAX,
        }
    }

    pub fn with_cloud_cover_max(mut self, percent: f64) -> Self {
        self.cloud_cover_max = percent;
        self
    }

    /// Resolve band contracts and build the composite query without executing it.
    ///
    /// Bands sharing a rescale are transformed together; datasets with a cloud
    /// property get a cloud cover filter.
    pub fn build_query(
        &self,
        bands: &[&str],
        collection: &str,
        region: &Region,
        window: TimeWindow,
        reducer: ReducerKind,
    ) -> Result<QuerySpec> {
        if bands.is_empty() {
            return Err(AnalysisError::configuration(format!(
                "composite of {} requested with no bands",
                collection
            )));
        }
        window.validate()?;
        let dataset = self.catalog.dataset(collection)?;

        let mut groups: Vec<(LinearRescale, Vec<String>)> = Vec::new();
        for band in bands {
            let spec = self.catalog.resolve(collection, band, reducer)?;
            if let Some(rescale) = spec.rescale {
                match groups.iter_mut().find(|(r, _)| *r == rescale) {
                    Some((_, members)) => members.push(spec.name.clone()),
                    None => groups.push((rescale, vec![spec.name.clone()])),
                }
            }
        }

        let mut filtered = query(collection, region, window);
        if let Some(property) = &dataset.cloud_property {
            filtered = filtered.with_filter(PropertyFilter::less_than(
                property.as_str(),
                self.cloud_cover_max,
            ));
        }
        for (rescale, members) in groups {
            filtered = filtered.rescale(members, rescale);
        }

        Ok(filtered.reduce_temporal(bands.iter().map(|b| b.to_string()).collect(), reducer))
    }

    /// Single-band composite over `window`
    pub async fn composite(
        &self,
        band: &str,
        collection: &str,
        region: &Region,
        window: TimeWindow,
        reducer: ReducerKind,
    ) -> Result<RasterComposite> {
        self.composite_bands(&[band], collection, region, window, reducer)
            .await
    }

    /// Multi-band composite; fails with `MissingData` when no image matches
    pub async fn composite_bands(
        &self,
        bands: &[&str],
        collection: &str,
        region: &Region,
        window: TimeWindow,
        reducer: ReducerKind,
    ) -> Result<RasterComposite> {
        let spec = self.build_query(bands, collection, region, window, reducer)?;
        debug!(
            "Compositing {:?} from {} over {} with {}",
            bands, collection, window, reducer
        );

        let raster = self
            .backend
            .execute(&spec)
            .await?
            .into_raster(collection)?
            .ok_or_else(|| AnalysisError::missing_data(collection, window.start, window.end))?;

        info!(
            "Composited {} {} over {} ({}x{} cells)",
            collection, reducer, window, raster.grid.width, raster.grid.height
        );

        Ok(RasterComposite {
            collection: collection.to_string(),
            bands: spec.bands(),
            reducer,
            window,
            raster,
        })
    }
}

/// Point layer of pixels whose `band` value exceeds `threshold`; all other cells masked
pub fn fire_points(
    composite: &RasterComposite,
    band: &str,
    threshold: f64,
) -> Result<RasterComposite> {
    let selected = composite
        .raster
        .select(&[band.to_string()])
        .ok_or_else(|| {
            AnalysisError::unsupported_band(
                &composite.collection,
                band,
                "band not present in composite",
            )
        })?;
    let raster = selected.mask_where(band, |v| v > threshold);

    if let Some(stats) = raster.stats(band) {
        debug!("{} fire points above {}", stats.valid, threshold);
    }

    Ok(RasterComposite {
        collection: composite.collection.clone(),
        bands: vec![band.to_string()],
        reducer: composite.reducer,
        window: composite.window,
        raster,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CollectionData, MemoryBackend, QueryResult, Scene};
    use crate::constants::{
        CLOUD_COVER_PROPERTY, CO_BAND, FRP_BAND, LANDSAT8_SR_COLLECTION, MODIS_FIRE_COLLECTION,
        S5P_CO_COLLECTION,
    };
    use crate::raster::GridSpec;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        inner: MemoryBackend,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(inner: MemoryBackend) -> Arc<Self> {
            Arc::new(Self {
                inner,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Backend for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn execute(&self, spec: &QuerySpec) -> Result<QueryResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.execute(spec).await
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn grid() -> GridSpec {
        GridSpec {
            west: 0.0,
            north: 4.0,
            cell_size: 1.0,
            width: 4,
            height: 4,
        }
    }

    fn fire_window() -> TimeWindow {
        TimeWindow::new(date(2019, 12, 15), date(2020, 1, 15)).unwrap()
    }

    fn compositor(backend: Arc<Counting>) -> PeriodCompositor {
        PeriodCompositor::new(backend, Arc::new(Catalog::standard()))
    }

    #[tokio::test]
    async fn test_reducer_mismatch_makes_no_backend_call() {
        let backend = Counting::new(MemoryBackend::new());
        let square = Region::polygon(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]).unwrap();

        let result = compositor(backend.clone())
            .composite(
                CO_BAND,
                S5P_CO_COLLECTION,
                &square,
                fire_window(),
                ReducerKind::Max,
            )
            .await;

        assert!(matches!(result, Err(AnalysisError::UnsupportedBand { .. })));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_single_image_max_equals_image_inside_region() {
        let cells: Vec<Option<f64>> = (0..16).map(|i| Some(i as f64 * 10.0)).collect();
        let collection = CollectionData::new(MODIS_FIRE_COLLECTION, grid())
            .with_scene(Scene::new(date(2019, 12, 31)).with_band(FRP_BAND, cells.clone()));
        let backend = Counting::new(MemoryBackend::new().with_collection(collection).unwrap());
        let original = crate::raster::Raster::new(grid())
            .with_band(FRP_BAND, cells)
            .unwrap();

        // triangle over the south-west of the grid
        let region = Region::polygon(&[(0.0, 0.0), (3.0, 0.0), (0.0, 3.0)]).unwrap();
        let composite = compositor(backend.clone())
            .composite(
                FRP_BAND,
                MODIS_FIRE_COLLECTION,
                &region,
                fire_window(),
                ReducerKind::Max,
            )
            .await
            .unwrap();
        assert_eq!(backend.calls(), 1);

        let clipped = &composite.raster;
        for row in 0..clipped.grid.height {
            for col in 0..clipped.grid.width {
                let (lon, lat) = clipped.grid.cell_center(col, row);
                let value = clipped.value(FRP_BAND, col, row);
                if region.contains(lon, lat) {
                    assert_eq!(value, original.sample(FRP_BAND, lon, lat));
                } else {
                    assert_eq!(value, None);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_landsat_band_groups_rescaled_and_clouds_filtered() {
        let clear = Scene::new(date(2020, 1, 2))
            .with_property(CLOUD_COVER_PROPERTY, 5.0)
            .with_band("SR_B4", vec![Some(20000.0); 16])
            .with_band("ST_B10", vec![Some(30000.0); 16]);
        let cloudy = Scene::new(date(2020, 1, 10))
            .with_property(CLOUD_COVER_PROPERTY, 90.0)
            .with_band("SR_B4", vec![Some(40000.0); 16])
            .with_band("ST_B10", vec![Some(40000.0); 16]);
        let collection = CollectionData::new(LANDSAT8_SR_COLLECTION, grid())
            .with_scene(clear)
            .with_scene(cloudy);
        let backend = Counting::new(MemoryBackend::new().with_collection(collection).unwrap());
        let square = Region::polygon(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]).unwrap();

        let composite = compositor(backend)
            .composite_bands(
                &["SR_B4", "ST_B10"],
                LANDSAT8_SR_COLLECTION,
                &square,
                fire_window(),
                ReducerKind::Mean,
            )
            .await
            .unwrap();

        let red = composite.raster.stats("SR_B4").unwrap();
        let thermal = composite.raster.stats("ST_B10").unwrap();
        assert!((red.mean.unwrap() - 0.35).abs() < 1e-9);
        assert!((thermal.mean.unwrap() - 251.5406).abs() < 1e-6);
        assert_eq!(composite.bands, vec!["SR_B4".to_string(), "ST_B10".to_string()]);
    }

    #[test]
    fn test_build_query_groups_rescales() {
        let backend = Counting::new(MemoryBackend::new());
        let square = Region::polygon(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]).unwrap();
        let spec = compositor(backend)
            .with_cloud_cover_max(20.0)
            .build_query(
                &["SR_B4", "SR_B3", "SR_B2", "ST_B10"],
                LANDSAT8_SR_COLLECTION,
                &square,
                fire_window(),
                ReducerKind::Mean,
            )
            .unwrap();

        assert_eq!(spec.query.rescales.len(), 2);
        assert_eq!(spec.query.rescales[0].bands.len(), 3);
        assert_eq!(
            spec.query.filters,
            vec![PropertyFilter::less_than(CLOUD_COVER_PROPERTY, 20.0)]
        );
    }

    #[tokio::test]
    async fn test_empty_window_is_missing_data() {
        let collection = CollectionData::new(MODIS_FIRE_COLLECTION, grid())
            .with_scene(Scene::new(date(2019, 6, 1)).with_band(FRP_BAND, vec![Some(1.0); 16]));
        let backend = Counting::new(MemoryBackend::new().with_collection(collection).unwrap());
        let square = Region::polygon(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]).unwrap();

        let result = compositor(backend)
            .composite(
                FRP_BAND,
                MODIS_FIRE_COLLECTION,
                &square,
                fire_window(),
                ReducerKind::Max,
            )
            .await;
        match result {
            Err(AnalysisError::MissingData { collection, .. }) => {
                assert_eq!(collection, MODIS_FIRE_COLLECTION)
            }
            other => panic!("Expected MissingData, got {:?}", other),
        }
    }

    #[test]
    fn test_fire_points_threshold() {
        let raster = crate::raster::Raster::new(GridSpec {
            west: 0.0,
            north: 1.0,
            cell_size: 1.0,
            width: 4,
            height: 1,
        })
        .with_band(FRP_BAND, vec![Some(0.0), Some(35.0), None, Some(5.0)])
        .unwrap();
        let composite = RasterComposite {
            collection: MODIS_FIRE_COLLECTION.to_string(),
            bands: vec![FRP_BAND.to_string()],
            reducer: ReducerKind::Max,
            window: fire_window(),
            raster,
        };

        let points = fire_points(&composite, FRP_BAND, 10.0).unwrap();
        assert_eq!(
            points.raster.band(FRP_BAND).unwrap(),
            &[None, Some(35.0), None, None]
        );
        assert!(fire_points(&composite, "T21", 10.0).is_err());
    }
}
