//! Application constants for the bushfire atmosphere analysis
//!
//! Collection identifiers, band names, sensor rescale constants, default study
//! periods and visualization palettes used throughout the crate.

// =============================================================================
// Collection Identifiers
// =============================================================================

/// Sentinel-5P offline CO column density (L3)
pub const S5P_CO_COLLECTION: &str = "COPERNICUS/S5P/OFFL/L3_CO";

/// Sentinel-5P offline NO2 column density (L3)
pub const S5P_NO2_COLLECTION: &str = "COPERNICUS/S5P/OFFL/L3_NO2";

/// Sentinel-5P offline absorbing aerosol index (L3)
pub const S5P_AER_AI_COLLECTION: &str = "COPERNICUS/S5P/OFFL/L3_AER_AI";

/// Landsat 8 collection 2 tier 1 level 2 surface reflectance
pub const LANDSAT8_SR_COLLECTION: &str = "LANDSAT/LC08/C02/T1_L2";

/// MODIS Terra daily thermal anomalies and fire
pub const MODIS_FIRE_COLLECTION: &str = "MODIS/061/MOD14A1";

// =============================================================================
// Band Names
// =============================================================================

pub const CO_BAND: &str = "CO_column_number_density";
pub const NO2_BAND: &str = "tropospheric_NO2_column_number_density";
pub const AER_AI_BAND: &str = "absorbing_aerosol_index";
pub const FRP_BAND: &str = "MaxFRP";

/// Landsat 8 optical surface reflectance bands (blue .. swir2)
pub const LANDSAT_OPTICAL_BANDS: &[&str] =
    &["SR_B1", "SR_B2", "SR_B3", "SR_B4", "SR_B5", "SR_B6", "SR_B7"];

/// Landsat 8 thermal surface temperature band
pub const LANDSAT_THERMAL_BANDS: &[&str] = &["ST_B10"];

/// Natural colour rendering (red, green, blue)
pub const TRUE_COLOR_BANDS: &[&str] = &["SR_B4", "SR_B3", "SR_B2"];

/// Scene metadata property carrying cloud cover percentage
pub const CLOUD_COVER_PROPERTY: &str = "CLOUD_COVER";

// =============================================================================
// Sensor Rescale Constants (Landsat collection 2 level 2)
// =============================================================================

/// Optical digital number to surface reflectance
pub mod optical_rescale {
    pub const SCALE: f64 = 0.0000275;
    pub const OFFSET: f64 = -0.2;
}

/// Thermal digital number to surface temperature in kelvin
pub mod thermal_rescale {
    pub const SCALE: f64 = 0.00341802;
    pub const OFFSET: f64 = 149.0;
}

// =============================================================================
// Reduction Defaults
// =============================================================================

/// Ground sampling distance for areal means, in metres
pub const DEFAULT_SCALE_M: f64 = 5000.0;

/// Pixel ceiling for a single spatial reduction
pub const DEFAULT_MAX_PIXELS: u64 = 1_000_000_000;

/// Scenes above this cloud cover percentage are excluded
pub const DEFAULT_CLOUD_COVER_MAX: f64 = 30.0;

/// Fire radiative power (MW) above which a pixel counts as an active fire point
pub const DEFAULT_FIRE_THRESHOLD: f64 = 0.0;

/// Metres per degree of latitude at the equator
pub const METERS_PER_DEGREE: f64 = 111_320.0;

// =============================================================================
// Study Periods
// =============================================================================

/// Multi-year monthly series window as (year, month, day), end exclusive
pub const TIME_SERIES_START: (i32, u32, u32) = (2019, 1, 1);
pub const TIME_SERIES_END: (i32, u32, u32) = (2021, 1, 1);

/// Peak fire period window, end exclusive
pub const FIRE_PERIOD_START: (i32, u32, u32) = (2019, 12, 15);
pub const FIRE_PERIOD_END: (i32, u32, u32) = (2020, 1, 15);

/// Aerosol composites start two weeks ahead of the fire period
pub const AEROSOL_PERIOD_START: (i32, u32, u32) = (2019, 12, 1);

/// Default study region: south-east Australian fire grounds (lon, lat)
pub const DEFAULT_REGION: &[(f64, f64)] = &[
    (146.5, -38.2),
    (150.4, -38.2),
    (151.6, -35.6),
    (151.0, -33.2),
    (148.2, -33.4),
    (146.5, -36.0),
    (146.5, -38.2),
];

pub const DEFAULT_MAP_CENTER: (f64, f64) = (149.0, -35.8);
pub const DEFAULT_MAP_ZOOM: u8 = 7;

// =============================================================================
// Retry Defaults
// =============================================================================

pub const DEFAULT_MAX_RETRIES: usize = 4;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 8_000;
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 60_000;

// =============================================================================
// Visualization Palettes
// =============================================================================

pub mod palettes {
    /// Sequential palette for trace-gas columns
    pub const TRACE_GAS: &[&str] = &[
        "black", "blue", "purple", "cyan", "green", "yellow", "red",
    ];

    /// Aerosol index, clear through dense smoke
    pub const AEROSOL: &[&str] = &["black", "blue", "purple", "cyan", "green", "yellow", "red"];

    /// Fire radiative power intensity
    pub const FIRE_INTENSITY: &[&str] = &["yellow", "orange", "red", "darkred"];

    /// Single-colour fire point marker
    pub const FIRE_POINTS: &[&str] = &["red"];

    /// Thermal surface temperature
    pub const THERMAL: &[&str] = &["blue", "cyan", "green", "yellow", "orange", "red"];
}

/// Build the output name for an exported chart table
pub fn chart_filename(name: &str, extension: &str) -> String {
    format!("{}.{}", name.to_lowercase().replace([' ', '/'], "_"), extension)
}
