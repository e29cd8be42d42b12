//! Configuration management and validation.
//!
//! One [`AnalysisConfig`] value carries everything a run needs: region geometry,
//! study periods, map view, reduction parameters, concurrency and retry policy.
//! It is threaded explicitly through every call; nothing is read from globals.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! `BUSHFIRE_ATMOS_*` environment variables, then command-line overrides.

use crate::backend::{RetryPolicy, SpatialParams};
use crate::constants::{
    AEROSOL_PERIOD_START, DEFAULT_CLOUD_COVER_MAX, DEFAULT_FIRE_THRESHOLD, DEFAULT_MAP_CENTER,
    DEFAULT_MAP_ZOOM, DEFAULT_MAX_PIXELS, DEFAULT_REGION, DEFAULT_SCALE_M, FIRE_PERIOD_END,
    FIRE_PERIOD_START, TIME_SERIES_END, TIME_SERIES_START,
};
use crate::error::{AnalysisError, Result};
use crate::models::{ReducerKind, Region, TimeWindow};
use crate::presentation::MapView;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "BUSHFIRE_ATMOS_";

/// Spatial reduction settings for areal statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionParams {
    /// Ground sampling distance in metres
    pub scale_m: f64,
    /// Pixel ceiling per reduction
    pub max_pixels: u64,
    /// Coarsen the scale instead of failing when the ceiling is exceeded
    pub best_effort: bool,
}

impl Default for ReductionParams {
    fn default() -> Self {
        Self {
            scale_m: DEFAULT_SCALE_M,
            max_pixels: DEFAULT_MAX_PIXELS,
            best_effort: true,
        }
    }
}

impl ReductionParams {
    pub fn spatial(&self, reducer: ReducerKind) -> SpatialParams {
        SpatialParams {
            reducer,
            scale_m: self.scale_m,
            max_pixels: self.max_pixels,
            best_effort: self.best_effort,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Exterior rings of the study region as `[lon, lat]` pairs
    pub region: Vec<Vec<[f64; 2]>>,
    /// Multi-year window for the monthly series
    pub time_series: TimeWindow,
    /// Peak fire window for the composites
    pub fire_period: TimeWindow,
    /// Start of the aerosol composite window, which ends with the fire period
    pub aerosol_start: NaiveDate,
    pub map_view: MapView,
    pub reduction: ReductionParams,
    /// Concurrent backend queries per series
    pub workers: usize,
    /// Maximum scene cloud cover percentage for optical composites
    pub cloud_cover_max: f64,
    /// Fire radiative power above which a pixel is a fire point
    pub fire_threshold: f64,
    pub retry: RetryPolicy,
}

fn ymd((year, month, day): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            region: vec![DEFAULT_REGION.iter().map(|&(lon, lat)| [lon, lat]).collect()],
            time_series: TimeWindow {
                start: ymd(TIME_SERIES_START),
                end: ymd(TIME_SERIES_END),
            },
            fire_period: TimeWindow {
                start: ymd(FIRE_PERIOD_START),
                end: ymd(FIRE_PERIOD_END),
            },
            aerosol_start: ymd(AEROSOL_PERIOD_START),
            map_view: MapView {
                lon: DEFAULT_MAP_CENTER.0,
                lat: DEFAULT_MAP_CENTER.1,
                zoom: DEFAULT_MAP_ZOOM,
            },
            reduction: ReductionParams::default(),
            workers: num_cpus::get().clamp(1, 8),
            cloud_cover_max: DEFAULT_CLOUD_COVER_MAX,
            fire_threshold: DEFAULT_FIRE_THRESHOLD,
            retry: RetryPolicy::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, rings: Vec<Vec<[f64; 2]>>) -> Self {
        self.region = rings;
        self
    }

    pub fn with_time_series(mut self, window: TimeWindow) -> Self {
        self.time_series = window;
        self
    }

    pub fn with_fire_period(mut self, window: TimeWindow, aerosol_start: NaiveDate) -> Self {
        self.fire_period = window;
        self.aerosol_start = aerosol_start;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_scale(mut self, scale_m: f64) -> Self {
        self.reduction.scale_m = scale_m;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Region geometry built from the configured rings
    pub fn region(&self) -> Result<Region> {
        let rings: Vec<Vec<(f64, f64)>> = self
            .region
            .iter()
            .map(|ring| ring.iter().map(|[lon, lat]| (*lon, *lat)).collect())
            .collect();
        Region::from_rings(&rings)
    }

    /// Aerosol composite window: aerosol start through the end of the fire period
    pub fn aerosol_window(&self) -> Result<TimeWindow> {
        TimeWindow::new(self.aerosol_start, self.fire_period.end)
    }

    pub fn validate(&self) -> Result<()> {
        self.region()?;
        self.time_series.validate()?;
        self.fire_period.validate()?;
        self.aerosol_window()?;

        if !(self.reduction.scale_m.is_finite() && self.reduction.scale_m > 0.0) {
            return Err(AnalysisError::configuration(format!(
                "reduction scale must be positive, got {}",
                self.reduction.scale_m
            )));
        }
        if self.reduction.max_pixels == 0 {
            return Err(AnalysisError::configuration("max_pixels must be at least 1"));
        }
        if self.workers == 0 {
            return Err(AnalysisError::configuration("workers must be at least 1"));
        }
        if !(0.0..=100.0).contains(&self.cloud_cover_max) {
            return Err(AnalysisError::configuration(format!(
                "cloud_cover_max must be a percentage, got {}",
                self.cloud_cover_max
            )));
        }
        if self.map_view.zoom > 24 {
            return Err(AnalysisError::configuration(format!(
                "map zoom {} out of range 0-24",
                self.map_view.zoom
            )));
        }
        self.retry.validate()?;
        Ok(())
    }

    /// Default config file location, `<config dir>/bushfire_atmos/config.json`
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("bushfire_atmos").join("config.json"))
            .ok_or_else(|| AnalysisError::configuration("no user config directory available"))
    }

    /// Read a JSON config file; absent keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            AnalysisError::configuration(format!("invalid config {}: {}", path.display(), e))
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Defaults, then the file (if any), then environment overrides
    pub fn load_layered(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => {
                info!("Using config file: {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `BUSHFIRE_ATMOS_*` overrides read through `lookup`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value.trim().parse().map_err(|_| {
                AnalysisError::configuration(format!("invalid value '{}' for {}", value, key))
            })
        }
        let var = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((key, value)) = var("WORKERS") {
            self.workers = parse(&key, &value)?;
            debug!("{} override: {}", key, self.workers);
        }
        if let Some((key, value)) = var("SCALE_M") {
            self.reduction.scale_m = parse(&key, &value)?;
            debug!("{} override: {}", key, self.reduction.scale_m);
        }
        if let Some((key, value)) = var("MAX_RETRIES") {
            self.retry.max_retries = parse(&key, &value)?;
            debug!("{} override: {}", key, self.retry.max_retries);
        }
        if let Some((key, value)) = var("TIMEOUT_MS") {
            self.retry.timeout_ms = parse(&key, &value)?;
            debug!("{} override: {}", key, self.retry.timeout_ms);
        }
        if let Some((key, value)) = var("CLOUD_COVER_MAX") {
            self.cloud_cover_max = parse(&key, &value)?;
            debug!("{} override: {}", key, self.cloud_cover_max);
        }
        Ok(())
    }
}
