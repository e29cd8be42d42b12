//! Presentation adapter
//!
//! The analysis hands its outputs to a [`Renderer`]: line charts for the monthly
//! series, styled map layers for the composites, and a map viewport. How they are
//! drawn is up to the implementation; [`RecordingRenderer`] keeps them in memory
//! and [`crate::export::ExportRenderer`] writes them to disk.

use crate::error::Result;
use crate::models::{AggregatedSample, ReducerKind, TimeWindow};
use crate::raster::Raster;
use serde::{Deserialize, Serialize};

/// Map viewport centre and zoom level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub lon: f64,
    pub lat: f64,
    pub zoom: u8,
}

/// Display style for a map layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    /// Bands mapped to the display, one for palette rendering or three for RGB
    pub bands: Vec<String>,
    pub min: f64,
    pub max: f64,
    pub palette: Vec<String>,
    pub visible: bool,
    pub opacity: f64,
}

impl VisParams {
    pub fn new(bands: &[&str], min: f64, max: f64) -> Self {
        Self {
            bands: bands.iter().map(|b| b.to_string()).collect(),
            min,
            max,
            palette: Vec::new(),
            visible: true,
            opacity: 1.0,
        }
    }

    pub fn with_palette(mut self, palette: &[&str]) -> Self {
        self.palette = palette.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Layer added to the map switched off
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Monthly series chart: x is the bucket label, y the sample value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub title: String,
    pub collection: String,
    pub band: String,
    pub unit: String,
    pub samples: Vec<AggregatedSample>,
}

impl LineChart {
    /// Labels of buckets with no imagery
    pub fn gaps(&self) -> Vec<&str> {
        self.samples
            .iter()
            .filter(|s| s.is_missing())
            .map(|s| s.label.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayer {
    pub name: String,
    pub collection: String,
    pub window: TimeWindow,
    pub reducer: ReducerKind,
    pub style: VisParams,
    pub raster: Raster,
}

impl MapLayer {
    /// Unmasked cells of the first styled band
    pub fn valid_cells(&self) -> usize {
        self.style
            .bands
            .first()
            .and_then(|band| self.raster.stats(band))
            .map(|stats| stats.valid)
            .unwrap_or(0)
    }
}

/// Sink for analysis outputs
pub trait Renderer: Send {
    fn line_chart(&mut self, chart: &LineChart) -> Result<()>;

    fn map_layer(&mut self, layer: &MapLayer) -> Result<()>;

    fn center_map(&mut self, view: MapView) -> Result<()>;

    /// Called once after the last output
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Renderer that records everything it is given
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub charts: Vec<LineChart>,
    pub layers: Vec<MapLayer>,
    pub view: Option<MapView>,
    pub finished: bool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(&self, name: &str) -> Option<&MapLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn chart(&self, title: &str) -> Option<&LineChart> {
        self.charts.iter().find(|c| c.title == title)
    }
}

impl Renderer for RecordingRenderer {
    fn line_chart(&mut self, chart: &LineChart) -> Result<()> {
        self.charts.push(chart.clone());
        Ok(())
    }

    fn map_layer(&mut self, layer: &MapLayer) -> Result<()> {
        self.layers.push(layer.clone());
        Ok(())
    }

    fn center_map(&mut self, view: MapView) -> Result<()> {
        self.view = Some(view);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
