//! In-process backend over exported scene collections
//!
//! Each collection is a set of dated scenes on one shared grid. Collections are
//! loaded from JSON files (one collection per file) and evaluated in memory with
//! the same filter/composite/reduce semantics as a hosted backend.

use super::query::{QueryResult, QuerySpec, Reduction};
use super::Backend;
use crate::error::{AnalysisError, Result};
use crate::raster::{self, GridSpec, Raster};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// One acquisition: date, metadata properties and band cells on the collection grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub date: NaiveDate,
    #[serde(default)]
    pub properties: BTreeMap<String, f64>,
    pub bands: BTreeMap<String, Vec<Option<f64>>>,
}

impl Scene {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            properties: BTreeMap::new(),
            bands: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: f64) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_band(mut self, name: impl Into<String>, cells: Vec<Option<f64>>) -> Self {
        self.bands.insert(name.into(), cells);
        self
    }

    fn to_raster(&self, grid: GridSpec) -> Raster {
        Raster {
            grid,
            bands: self.bands.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionData {
    pub id: String,
    pub grid: GridSpec,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

impl CollectionData {
    pub fn new(id: impl Into<String>, grid: GridSpec) -> Self {
        Self {
            id: id.into(),
            grid,
            scenes: Vec::new(),
        }
    }

    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.scenes.push(scene);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        for scene in &self.scenes {
            for (band, cells) in &scene.bands {
                if cells.len() != self.grid.len() {
                    return Err(AnalysisError::configuration(format!(
                        "{} scene {} band '{}' has {} cells, grid has {}",
                        self.id,
                        scene.date,
                        band,
                        cells.len(),
                        self.grid.len()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.scenes.iter().map(|s| s.date).min()?;
        let last = self.scenes.iter().map(|s| s.date).max()?;
        Some((first, last))
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: HashMap<String, CollectionData>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a collection
    pub fn insert(&mut self, collection: CollectionData) -> Result<()> {
        collection.validate()?;
        debug!(
            "Registered collection {} with {} scenes",
            collection.id,
            collection.scenes.len()
        );
        self.collections.insert(collection.id.clone(), collection);
        Ok(())
    }

    pub fn with_collection(mut self, collection: CollectionData) -> Result<Self> {
        self.insert(collection)?;
        Ok(self)
    }

    /// Load every `*.json` collection file in `dir`
    pub fn load_catalog(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(AnalysisError::catalog(dir, "catalog directory not found"));
        }

        let pattern = dir.join("*.json");
        let pattern_str = pattern.to_string_lossy();
        let paths = glob::glob(&pattern_str)
            .map_err(|e| AnalysisError::catalog(dir, format!("invalid glob pattern: {}", e)))?;

        let mut backend = Self::new();
        for entry in paths {
            let path = entry.map_err(|e| AnalysisError::catalog(dir, e.to_string()))?;
            let text = std::fs::read_to_string(&path)?;
            let collection: CollectionData = serde_json::from_str(&text)
                .map_err(|e| AnalysisError::catalog(&path, e.to_string()))?;
            collection
                .validate()
                .map_err(|e| AnalysisError::catalog(&path, e.to_string()))?;
            backend.insert(collection)?;
        }

        if backend.collections.is_empty() {
            return Err(AnalysisError::catalog(dir, "no collection files found"));
        }

        info!(
            "Loaded {} collections from {}",
            backend.collections.len(),
            dir.display()
        );
        Ok(backend)
    }

    pub fn collections(&self) -> impl Iterator<Item = &CollectionData> {
        self.collections.values()
    }

    pub fn collection(&self, id: &str) -> Option<&CollectionData> {
        self.collections.get(id)
    }

    /// Scenes matching the query's window, region and filters, with rescales applied
    fn select_scenes(&self, spec: &QuerySpec) -> Result<Vec<Raster>> {
        let query = &spec.query;
        let collection = self.collections.get(&query.collection).ok_or_else(|| {
            AnalysisError::backend(&query.collection, "collection not found in backend")
        })?;

        if !collection.grid.intersects_region(&query.region) {
            debug!("{} grid does not intersect the region", collection.id);
            return Ok(Vec::new());
        }

        let bands = spec.bands();
        let mut rasters = Vec::new();
        for scene in &collection.scenes {
            if !query.window.contains(scene.date) {
                continue;
            }
            if !query.filters.iter().all(|f| f.matches(&scene.properties)) {
                continue;
            }
            if let Some(missing) = bands.iter().find(|b| !scene.bands.contains_key(*b)) {
                return Err(AnalysisError::unsupported_band(
                    &collection.id,
                    missing,
                    format!("band absent from scene {}", scene.date),
                ));
            }

            let mut raster = scene.to_raster(collection.grid);
            for step in &query.rescales {
                raster = raster.rescale(step.rescale, &step.bands);
            }
            rasters.push(raster);
        }

        debug!(
            "{} scenes of {} match {}",
            rasters.len(),
            collection.id,
            query.window
        );
        Ok(rasters)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn execute(&self, spec: &QuerySpec) -> Result<QueryResult> {
        let stack = self.select_scenes(spec)?;
        let query = &spec.query;

        match &spec.reduction {
            Reduction::Spatial {
                band,
                temporal,
                params,
            } => {
                let composite =
                    raster::reduce_temporal(&stack, std::slice::from_ref(band), *temporal)?;
                let value = match composite {
                    Some(composite) => raster::reduce_region(
                        &composite,
                        band,
                        &query.region,
                        params.reducer,
                        params.scale_m,
                        params.max_pixels,
                        params.best_effort,
                    )
                    .map_err(|e| match e {
                        AnalysisError::Backend { reason, .. } => {
                            AnalysisError::backend(&query.collection, reason)
                        }
                        other => other,
                    })?,
                    None => None,
                };
                Ok(QueryResult::Scalar(value))
            }
            Reduction::Temporal { bands, reducer } => {
                let composite = raster::reduce_temporal(&stack, bands, *reducer)?;
                Ok(QueryResult::Raster(
                    composite.and_then(|c| c.clip(&query.region)),
                ))
            }
        }
    }
}
