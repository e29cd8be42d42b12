//! Query specification types
//!
//! A [`QuerySpec`] fully determines a reduction: collection, region, window,
//! property filters, per-band rescales and the reduction itself. Building one is
//! pure and synchronous.

use crate::error::{AnalysisError, Result};
use crate::models::{ReducerKind, Region, TimeWindow};
use crate::raster::{LinearRescale, Raster};
use std::collections::BTreeMap;

/// Scene metadata predicate
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyFilter {
    LessThan { property: String, value: f64 },
    GreaterThan { property: String, value: f64 },
}

impl PropertyFilter {
    pub fn less_than(property: impl Into<String>, value: f64) -> Self {
        Self::LessThan {
            property: property.into(),
            value,
        }
    }

    pub fn greater_than(property: impl Into<String>, value: f64) -> Self {
        Self::GreaterThan {
            property: property.into(),
            value,
        }
    }

    /// Scenes lacking the property never match
    pub fn matches(&self, properties: &BTreeMap<String, f64>) -> bool {
        match self {
            Self::LessThan { property, value } => {
                properties.get(property).is_some_and(|v| v < value)
            }
            Self::GreaterThan { property, value } => {
                properties.get(property).is_some_and(|v| v > value)
            }
        }
    }
}

/// Linear transform applied to a group of bands on every scene before reduction
#[derive(Debug, Clone, PartialEq)]
pub struct BandRescale {
    pub bands: Vec<String>,
    pub rescale: LinearRescale,
}

/// Parameters of a spatial reduction to a scalar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialParams {
    pub reducer: ReducerKind,
    pub scale_m: f64,
    pub max_pixels: u64,
    pub best_effort: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    /// Temporal composite of one band reduced over the region to a scalar
    Spatial {
        band: String,
        temporal: ReducerKind,
        params: SpatialParams,
    },
    /// Temporal composite of one or more bands, clipped to the region
    Temporal {
        bands: Vec<String>,
        reducer: ReducerKind,
    },
}

/// Filtered collection, the first phase of a query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub region: Region,
    pub window: TimeWindow,
    pub filters: Vec<PropertyFilter>,
    pub rescales: Vec<BandRescale>,
}

/// Filter `collection` to images intersecting `region` within `window`
pub fn query(collection: impl Into<String>, region: &Region, window: TimeWindow) -> Query {
    Query {
        collection: collection.into(),
        region: region.clone(),
        window,
        filters: Vec::new(),
        rescales: Vec::new(),
    }
}

impl Query {
    pub fn with_filter(mut self, filter: PropertyFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn rescale(mut self, bands: Vec<String>, rescale: LinearRescale) -> Self {
        if !bands.is_empty() {
            self.rescales.push(BandRescale { bands, rescale });
        }
        self
    }

    /// Temporal composite of `band`, then a spatial reduction to one number
    pub fn reduce_spatial(
        self,
        band: impl Into<String>,
        temporal: ReducerKind,
        params: SpatialParams,
    ) -> QuerySpec {
        QuerySpec {
            query: self,
            reduction: Reduction::Spatial {
                band: band.into(),
                temporal,
                params,
            },
        }
    }

    /// Pixel-wise temporal composite of `bands`, clipped to the region
    pub fn reduce_temporal(self, bands: Vec<String>, reducer: ReducerKind) -> QuerySpec {
        QuerySpec {
            query: self,
            reduction: Reduction::Temporal { bands, reducer },
        }
    }
}

/// Complete, backend-independent description of one reduction
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub query: Query,
    pub reduction: Reduction,
}

impl QuerySpec {
    pub fn collection(&self) -> &str {
        &self.query.collection
    }

    /// Bands the reduction reads
    pub fn bands(&self) -> Vec<String> {
        match &self.reduction {
            Reduction::Spatial { band, .. } => vec![band.clone()],
            Reduction::Temporal { bands, .. } => bands.clone(),
        }
    }
}

/// Backend answer; `None` payloads mean no imagery matched
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Scalar(Option<f64>),
    Raster(Option<Raster>),
}

impl QueryResult {
    pub fn into_scalar(self, collection: &str) -> Result<Option<f64>> {
        match self {
            Self::Scalar(value) => Ok(value),
            Self::Raster(_) => Err(AnalysisError::backend(
                collection,
                "expected a scalar result, got a raster",
            )),
        }
    }

    pub fn into_raster(self, collection: &str) -> Result<Option<Raster>> {
        match self {
            Self::Raster(raster) => Ok(raster),
            Self::Scalar(_) => Err(AnalysisError::backend(
                collection,
                "expected a raster result, got a scalar",
            )),
        }
    }
}
