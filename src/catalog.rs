//! Dataset and band definitions.
//!
//! Each band carries its physical unit, a plausible value range and the temporal
//! reducers it may be aggregated with. Requests are checked against these
//! definitions before any backend query is issued.

use crate::constants::{
    self, AER_AI_BAND, CLOUD_COVER_PROPERTY, CO_BAND, FRP_BAND, LANDSAT_OPTICAL_BANDS,
    LANDSAT_THERMAL_BANDS, LANDSAT8_SR_COLLECTION, MODIS_FIRE_COLLECTION, NO2_BAND,
    S5P_AER_AI_COLLECTION, S5P_CO_COLLECTION, S5P_NO2_COLLECTION,
};
use crate::error::{AnalysisError, Result};
use crate::models::ReducerKind;
use crate::raster::LinearRescale;
use serde::Serialize;

/// A named physical quantity in one dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandSpec {
    pub name: String,
    pub unit: String,
    pub valid_range: (f64, f64),
    pub reducers: Vec<ReducerKind>,
    /// Transform from stored digital numbers to physical units
    pub rescale: Option<LinearRescale>,
}

impl BandSpec {
    pub fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        valid_range: (f64, f64),
        reducers: &[ReducerKind],
    ) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            valid_range,
            reducers: reducers.to_vec(),
            rescale: None,
        }
    }

    pub fn with_rescale(mut self, rescale: LinearRescale) -> Self {
        self.rescale = Some(rescale);
        self
    }

    pub fn supports(&self, reducer: ReducerKind) -> bool {
        self.reducers.contains(&reducer)
    }

    pub fn in_valid_range(&self, value: f64) -> bool {
        value >= self.valid_range.0 && value <= self.valid_range.1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSpec {
    pub id: String,
    pub title: String,
    pub bands: Vec<BandSpec>,
    /// Scene property holding cloud cover percentage, if the dataset has one
    pub cloud_property: Option<String>,
}

impl DatasetSpec {
    pub fn new(id: impl Into<String>, title: impl Into<String>, bands: Vec<BandSpec>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            bands,
            cloud_property: None,
        }
    }

    pub fn with_cloud_property(mut self, property: impl Into<String>) -> Self {
        self.cloud_property = Some(property.into());
        self
    }

    pub fn band(&self, name: &str) -> Result<&BandSpec> {
        self.bands.iter().find(|b| b.name == name).ok_or_else(|| {
            AnalysisError::unsupported_band(
                &self.id,
                name,
                format!(
                    "available bands: {}",
                    self.bands
                        .iter()
                        .map(|b| b.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    datasets: Vec<DatasetSpec>,
}

impl Catalog {
    pub fn new(datasets: Vec<DatasetSpec>) -> Self {
        Self { datasets }
    }

    /// Sentinel-5P, Landsat 8 and MODIS fire datasets used by the fire-season analysis
    pub fn standard() -> Self {
        use ReducerKind::{Max, Mean};

        let optical = LinearRescale::new(
            constants::optical_rescale::SCALE,
            constants::optical_rescale::OFFSET,
        );
        let thermal = LinearRescale::new(
            constants::thermal_rescale::SCALE,
            constants::thermal_rescale::OFFSET,
        );

        let landsat_bands = LANDSAT_OPTICAL_BANDS
            .iter()
            .map(|b| BandSpec::new(*b, "reflectance", (-0.2, 1.6), &[Mean]).with_rescale(optical))
            .chain(LANDSAT_THERMAL_BANDS.iter().map(|b| {
                BandSpec::new(*b, "K", (149.0, 373.0), &[Mean]).with_rescale(thermal)
            }))
            .collect();

        Self::new(vec![
            DatasetSpec::new(
                S5P_CO_COLLECTION,
                "Sentinel-5P CO column",
                vec![BandSpec::new(CO_BAND, "mol/m^2", (-34.43, 5.71), &[Mean])],
            ),
            DatasetSpec::new(
                S5P_NO2_COLLECTION,
                "Sentinel-5P tropospheric NO2 column",
                vec![BandSpec::new(NO2_BAND, "mol/m^2", (-0.0006, 0.0096), &[Mean])],
            ),
            DatasetSpec::new(
                S5P_AER_AI_COLLECTION,
                "Sentinel-5P absorbing aerosol index",
                vec![BandSpec::new(AER_AI_BAND, "index", (-20.0, 40.0), &[Mean])],
            ),
            DatasetSpec::new(
                LANDSAT8_SR_COLLECTION,
                "Landsat 8 surface reflectance",
                landsat_bands,
            )
            .with_cloud_property(CLOUD_COVER_PROPERTY),
            DatasetSpec::new(
                MODIS_FIRE_COLLECTION,
                "MODIS daily fire radiative power",
                vec![BandSpec::new(FRP_BAND, "MW", (0.0, 180_000.0), &[Mean, Max])],
            ),
        ])
    }

    pub fn datasets(&self) -> &[DatasetSpec] {
        &self.datasets
    }

    pub fn dataset(&self, id: &str) -> Result<&DatasetSpec> {
        self.datasets
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| AnalysisError::unsupported_band(id, "*", "collection is not in the catalog"))
    }

    /// Look up a band and check the reducer against its aggregation contract
    pub fn resolve(&self, collection: &str, band: &str, reducer: ReducerKind) -> Result<&BandSpec> {
        let spec = self.dataset(collection)?.band(band)?;
        if !spec.supports(reducer) {
            return Err(AnalysisError::unsupported_band(
                collection,
                band,
                format!(
                    "reducer '{}' not allowed, supported: {}",
                    reducer,
                    spec.reducers
                        .iter()
                        .map(|r| r.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ));
        }
        Ok(spec)
    }
}
