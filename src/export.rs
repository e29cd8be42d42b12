//! File renderer
//!
//! Writes each line chart as a table with columns `label`, `start`, `end` and a
//! nullable `value`, in Parquet or CSV. Each map layer goes to `layers/<name>.json`
//! and a `layers.json` manifest lists them with the map view.

use crate::constants::chart_filename;
use crate::error::Result;
use crate::models::{ReducerKind, TimeWindow};
use crate::presentation::{LineChart, MapLayer, MapView, Renderer};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output table format for chart series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Parquet,
    Csv,
}

impl TableFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TableFormat::Parquet => "parquet",
            TableFormat::Csv => "csv",
        }
    }
}

/// Manifest line for one written layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    pub name: String,
    pub collection: String,
    pub window: TimeWindow,
    pub reducer: ReducerKind,
    pub file: String,
    pub valid_cells: usize,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerManifest {
    pub view: Option<MapView>,
    pub layers: Vec<LayerEntry>,
}

pub struct ExportRenderer {
    output_dir: PathBuf,
    format: TableFormat,
    view: Option<MapView>,
    layers: Vec<LayerEntry>,
    written: Vec<PathBuf>,
}

impl ExportRenderer {
    pub fn new(output_dir: &Path, format: TableFormat) -> Result<Self> {
        fs::create_dir_all(output_dir.join("layers"))?;
        debug!("Exporting to {}", output_dir.display());
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            format,
            view: None,
            layers: Vec::new(),
            written: Vec::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Every file written so far, manifest included once finished
    pub fn written_files(&self) -> &[PathBuf] {
        &self.written
    }

    fn chart_frame(chart: &LineChart) -> PolarsResult<DataFrame> {
        let labels: Vec<String> = chart.samples.iter().map(|s| s.label.clone()).collect();
        let starts: Vec<String> = chart
            .samples
            .iter()
            .map(|s| s.window.start.to_string())
            .collect();
        let ends: Vec<String> = chart
            .samples
            .iter()
            .map(|s| s.window.end.to_string())
            .collect();
        let values: Vec<Option<f64>> = chart.samples.iter().map(|s| s.value).collect();

        df!(
            "label" => labels,
            "start" => starts,
            "end" => ends,
            "value" => values,
        )
    }

    fn write_table(&self, frame: &mut DataFrame, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        match self.format {
            TableFormat::Parquet => {
                ParquetWriter::new(&mut file)
                    .with_compression(ParquetCompression::Snappy)
                    .with_statistics(StatisticsOptions::full())
                    .finish(frame)?;
            }
            TableFormat::Csv => {
                CsvWriter::new(&mut file)
                    .include_header(true)
                    .finish(frame)?;
            }
        }
        Ok(())
    }
}

impl Renderer for ExportRenderer {
    fn line_chart(&mut self, chart: &LineChart) -> Result<()> {
        let mut frame = Self::chart_frame(chart)?;
        let path = self
            .output_dir
            .join(chart_filename(&chart.title, self.format.extension()));
        self.write_table(&mut frame, &path)?;
        info!(
            "Wrote {} ({} months, {} missing)",
            path.display(),
            frame.height(),
            chart.gaps().len()
        );
        self.written.push(path);
        Ok(())
    }

    fn map_layer(&mut self, layer: &MapLayer) -> Result<()> {
        let file = format!("layers/{}", chart_filename(&layer.name, "json"));
        let path = self.output_dir.join(&file);
        fs::write(&path, serde_json::to_string(layer)?)?;

        let valid_cells = layer.valid_cells();
        debug!("Wrote layer {} ({} valid cells)", layer.name, valid_cells);

        self.layers.push(LayerEntry {
            name: layer.name.clone(),
            collection: layer.collection.clone(),
            window: layer.window,
            reducer: layer.reducer,
            file,
            valid_cells,
            visible: layer.style.visible,
        });
        self.written.push(path);
        Ok(())
    }

    fn center_map(&mut self, view: MapView) -> Result<()> {
        self.view = Some(view);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let manifest = LayerManifest {
            view: self.view,
            layers: self.layers.clone(),
        };
        let path = self.output_dir.join("layers.json");
        fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;
        info!(
            "Wrote layer manifest with {} layers to {}",
            manifest.layers.len(),
            path.display()
        );
        self.written.push(path);
        Ok(())
    }
}
