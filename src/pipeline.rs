//! End-to-end fire-season analysis
//!
//! Wires configuration, aggregator, compositor and renderer together:
//!
//! 1. Validate the configuration and centre the map
//! 2. Build the CO and NO2 monthly series concurrently and chart them
//! 3. Build the period composites and hand each to the renderer as a map layer
//! 4. Summarise what was produced and what had no imagery
//!
//! Validation and backend failures abort the run. A composite window with no
//! imagery is recorded as a missing layer and the run continues.

use crate::aggregator::{MonthlyAggregator, MonthlySeries};
use crate::backend::Backend;
use crate::buckets::{Cadence, list_buckets};
use crate::catalog::Catalog;
use crate::compositor::{PeriodCompositor, fire_points};
use crate::config::AnalysisConfig;
use crate::constants::{
    AER_AI_BAND, CO_BAND, FRP_BAND, LANDSAT_THERMAL_BANDS, LANDSAT8_SR_COLLECTION,
    MODIS_FIRE_COLLECTION, NO2_BAND, S5P_AER_AI_COLLECTION, S5P_CO_COLLECTION,
    S5P_NO2_COLLECTION, TRUE_COLOR_BANDS, palettes,
};
use crate::error::{AnalysisError, Result};
use crate::models::{RasterComposite, ReducerKind, Region, TimeWindow};
use crate::presentation::{LineChart, MapLayer, Renderer, VisParams};
use crate::report::{LayerSummary, MissingLayer, SeriesSummary, SummaryReport};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const CO_CHART: &str = "CO Monthly Mean";
pub const NO2_CHART: &str = "NO2 Monthly Mean";

pub const CO_LAYER: &str = "CO Fire Period";
pub const NO2_LAYER: &str = "NO2 Fire Period";
pub const AEROSOL_LAYER: &str = "Aerosol Index";
pub const TRUE_COLOR_LAYER: &str = "Landsat True Colour";
pub const THERMAL_LAYER: &str = "Landsat Thermal";
pub const FIRE_INTENSITY_LAYER: &str = "Fire Intensity";
pub const FIRE_POINTS_LAYER: &str = "Fire Points";

/// One composite to build and how to draw it
struct LayerRequest {
    name: &'static str,
    collection: &'static str,
    bands: Vec<&'static str>,
    window: TimeWindow,
    reducer: ReducerKind,
    style: VisParams,
}

pub struct AnalysisPipeline {
    config: AnalysisConfig,
    backend: Arc<dyn Backend>,
    catalog: Arc<Catalog>,
    show_progress: bool,
}

impl AnalysisPipeline {
    pub fn new(config: AnalysisConfig, backend: Arc<dyn Backend>, catalog: Arc<Catalog>) -> Self {
        Self {
            config,
            backend,
            catalog,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub async fn run(
        &self,
        renderer: &mut dyn Renderer,
        cancel: &CancellationToken,
    ) -> Result<SummaryReport> {
        let start_time = Instant::now();
        let config = &self.config;
        config.validate()?;

        let region = config.region()?;
        let aerosol_window = config.aerosol_window()?;
        info!(
            "Analysing {} polygon(s), series {}, fire period {}",
            region.polygon_count(),
            config.time_series,
            config.fire_period
        );

        let mut report = SummaryReport::new(
            &region,
            config.time_series,
            config.fire_period,
            aerosol_window,
        );
        renderer.center_map(config.map_view)?;

        let (co, no2) = self.build_series(&region, cancel).await?;
        for (title, series) in [(CO_CHART, co), (NO2_CHART, no2)] {
            let chart = LineChart {
                title: title.to_string(),
                collection: series.collection.clone(),
                band: series.band.clone(),
                unit: series.unit.clone(),
                samples: series.samples,
            };
            renderer.line_chart(&chart)?;
            report.add_dataset(&chart.collection);
            report.series.push(SeriesSummary::from_chart(&chart));
        }

        self.build_layers(&region, aerosol_window, renderer, &mut report, cancel)
            .await?;

        renderer.finish()?;
        report.elapsed_ms = start_time.elapsed().as_millis();
        info!(
            "Analysis complete: {} layers, {} missing layers, {} months without imagery",
            report.layers.len(),
            report.missing_layers.len(),
            report.total_missing_months()
        );
        Ok(report)
    }

    async fn build_series(
        &self,
        region: &Region,
        cancel: &CancellationToken,
    ) -> Result<(MonthlySeries, MonthlySeries)> {
        let config = &self.config;
        let months = list_buckets(&config.time_series, Cadence::Monthly)?.len();

        let progress = if self.show_progress {
            let pb = ProgressBar::new(2 * months as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.set_message("Aggregating monthly series...");
            pb
        } else {
            ProgressBar::hidden()
        };

        let aggregator = MonthlyAggregator::new(self.backend.clone(), self.catalog.clone())
            .with_reduction(config.reduction)
            .with_workers(config.workers);

        let both = async {
            tokio::try_join!(
                aggregator.series(
                    CO_BAND,
                    S5P_CO_COLLECTION,
                    region,
                    &config.time_series,
                    Some(&progress),
                ),
                aggregator.series(
                    NO2_BAND,
                    S5P_NO2_COLLECTION,
                    region,
                    &config.time_series,
                    Some(&progress),
                ),
            )
        };

        let result = tokio::select! {
            result = both => result,
            _ = cancel.cancelled() => Err(AnalysisError::Cancelled {
                reason: "monthly aggregation interrupted".to_string(),
            }),
        };
        progress.finish_and_clear();
        result
    }

    fn layer_requests(&self, aerosol_window: TimeWindow) -> Vec<LayerRequest> {
        let fire_period = self.config.fire_period;
        vec![
            LayerRequest {
                name: CO_LAYER,
                collection: S5P_CO_COLLECTION,
                bands: vec![CO_BAND],
                window: fire_period,
                reducer: ReducerKind::Mean,
                style: VisParams::new(&[CO_BAND], 0.0, 0.05)
                    .with_palette(palettes::TRACE_GAS)
                    .with_opacity(0.7),
            },
            LayerRequest {
                name: NO2_LAYER,
                collection: S5P_NO2_COLLECTION,
                bands: vec![NO2_BAND],
                window: fire_period,
                reducer: ReducerKind::Mean,
                style: VisParams::new(&[NO2_BAND], 0.0, 0.0002)
                    .with_palette(palettes::TRACE_GAS)
                    .with_opacity(0.7)
                    .hidden(),
            },
            LayerRequest {
                name: AEROSOL_LAYER,
                collection: S5P_AER_AI_COLLECTION,
                bands: vec![AER_AI_BAND],
                window: aerosol_window,
                reducer: ReducerKind::Mean,
                style: VisParams::new(&[AER_AI_BAND], -1.0, 2.0)
                    .with_palette(palettes::AEROSOL)
                    .with_opacity(0.6)
                    .hidden(),
            },
            LayerRequest {
                name: TRUE_COLOR_LAYER,
                collection: LANDSAT8_SR_COLLECTION,
                bands: TRUE_COLOR_BANDS.to_vec(),
                window: fire_period,
                reducer: ReducerKind::Mean,
                style: VisParams::new(TRUE_COLOR_BANDS, 0.0, 0.3),
            },
            LayerRequest {
                name: THERMAL_LAYER,
                collection: LANDSAT8_SR_COLLECTION,
                bands: LANDSAT_THERMAL_BANDS.to_vec(),
                window: fire_period,
                reducer: ReducerKind::Mean,
                style: VisParams::new(LANDSAT_THERMAL_BANDS, 280.0, 330.0)
                    .with_palette(palettes::THERMAL)
                    .hidden(),
            },
            LayerRequest {
                name: FIRE_INTENSITY_LAYER,
                collection: MODIS_FIRE_COLLECTION,
                bands: vec![FRP_BAND],
                window: fire_period,
                reducer: ReducerKind::Max,
                style: VisParams::new(&[FRP_BAND], 0.0, 500.0)
                    .with_palette(palettes::FIRE_INTENSITY),
            },
        ]
    }

    async fn build_layers(
        &self,
        region: &Region,
        aerosol_window: TimeWindow,
        renderer: &mut dyn Renderer,
        report: &mut SummaryReport,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let compositor = PeriodCompositor::new(self.backend.clone(), self.catalog.clone())
            .with_cloud_cover_max(self.config.cloud_cover_max);

        let mut fire_composite: Option<RasterComposite> = None;
        for request in self.layer_requests(aerosol_window) {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled {
                    reason: format!("stopped before layer '{}'", request.name),
                });
            }

            let built = tokio::select! {
                built = compositor.composite_bands(
                    &request.bands,
                    request.collection,
                    region,
                    request.window,
                    request.reducer,
                ) => built,
                _ = cancel.cancelled() => Err(AnalysisError::Cancelled {
                    reason: format!("layer '{}' interrupted", request.name),
                }),
            };

            match built {
                Ok(composite) => {
                    emit_layer(renderer, report, request.name, request.style, &composite)?;
                    if request.collection == MODIS_FIRE_COLLECTION {
                        fire_composite = Some(composite);
                    }
                }
                Err(e) if !e.is_fatal() => {
                    warn!("Layer '{}' skipped: {}", request.name, e);
                    report.missing_layers.push(MissingLayer {
                        name: request.name.to_string(),
                        collection: request.collection.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        match fire_composite {
            Some(composite) => {
                let points = fire_points(&composite, FRP_BAND, self.config.fire_threshold)?;
                let style = VisParams::new(&[FRP_BAND], 0.0, 1.0).with_palette(palettes::FIRE_POINTS);
                emit_layer(renderer, report, FIRE_POINTS_LAYER, style, &points)?;
            }
            None => report.missing_layers.push(MissingLayer {
                name: FIRE_POINTS_LAYER.to_string(),
                collection: MODIS_FIRE_COLLECTION.to_string(),
                reason: "no fire intensity composite to derive points from".to_string(),
            }),
        }
        Ok(())
    }
}

fn emit_layer(
    renderer: &mut dyn Renderer,
    report: &mut SummaryReport,
    name: &str,
    style: VisParams,
    composite: &RasterComposite,
) -> Result<()> {
    let layer = MapLayer {
        name: name.to_string(),
        collection: composite.collection.clone(),
        window: composite.window,
        reducer: composite.reducer,
        style,
        raster: composite.raster.clone(),
    };
    renderer.map_layer(&layer)?;
    report.add_dataset(&layer.collection);
    report.layers.push(LayerSummary::from_layer(&layer));
    Ok(())
}
