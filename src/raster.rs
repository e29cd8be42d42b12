//! Gridded multi-band rasters and the pixel operations the backend performs on them.
//!
//! Cells are stored row-major from the north-west corner. A `None` cell is masked:
//! no observation, cloud, or outside the clip region.

use crate::constants::METERS_PER_DEGREE;
use crate::error::{AnalysisError, Result};
use crate::models::{ReducerKind, Region};
use geo_types::Rect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Regular lon/lat grid anchored at its north-west corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub west: f64,
    pub north: f64,
    /// Cell edge length in degrees
    pub cell_size: f64,
    pub width: usize,
    pub height: usize,
}

impl GridSpec {
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn east(&self) -> f64 {
        self.west + self.cell_size * self.width as f64
    }

    pub fn south(&self) -> f64 {
        self.north - self.cell_size * self.height as f64
    }

    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.west + (col as f64 + 0.5) * self.cell_size,
            self.north - (row as f64 + 0.5) * self.cell_size,
        )
    }

    /// Column and row of the cell containing the point
    pub fn cell_at(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        if lon < self.west || lon >= self.east() || lat > self.north || lat <= self.south() {
            return None;
        }
        let col = ((lon - self.west) / self.cell_size).floor() as usize;
        let row = ((self.north - lat) / self.cell_size).floor() as usize;
        if col < self.width && row < self.height {
            Some((col, row))
        } else {
            None
        }
    }

    pub fn intersects_region(&self, region: &Region) -> bool {
        let bounds = region.bounds();
        bounds.min().x < self.east()
            && bounds.max().x > self.west
            && bounds.min().y < self.north
            && bounds.max().y > self.south()
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(AnalysisError::configuration(format!(
                "grid cell size must be positive, got {}",
                self.cell_size
            )));
        }
        if self.is_empty() {
            return Err(AnalysisError::configuration("grid has no cells"));
        }
        Ok(())
    }
}

/// Linear digital-number transform, `value * scale + offset`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearRescale {
    pub scale: f64,
    pub offset: f64,
}

impl LinearRescale {
    pub const fn new(scale: f64, offset: f64) -> Self {
        Self { scale, offset }
    }

    pub fn apply(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }
}

/// Summary statistics over the unmasked cells of one band
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandStats {
    pub valid: usize,
    pub masked: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raster {
    pub grid: GridSpec,
    pub bands: BTreeMap<String, Vec<Option<f64>>>,
}

impl Raster {
    pub fn new(grid: GridSpec) -> Self {
        Self {
            grid,
            bands: BTreeMap::new(),
        }
    }

    /// Add a band, checking the cell count against the grid
    pub fn with_band(mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.grid.len() {
            return Err(AnalysisError::configuration(format!(
                "band '{}' has {} cells, grid has {}",
                name,
                values.len(),
                self.grid.len()
            )));
        }
        self.bands.insert(name, values);
        Ok(self)
    }

    /// Raster with a single band of one value everywhere
    pub fn constant(grid: GridSpec, band: impl Into<String>, value: f64) -> Self {
        let mut raster = Self::new(grid);
        raster.bands.insert(band.into(), vec![Some(value); grid.len()]);
        raster
    }

    pub fn band(&self, name: &str) -> Option<&[Option<f64>]> {
        self.bands.get(name).map(|v| v.as_slice())
    }

    pub fn band_names(&self) -> Vec<String> {
        self.bands.keys().cloned().collect()
    }

    pub fn value(&self, band: &str, col: usize, row: usize) -> Option<f64> {
        if col >= self.grid.width || row >= self.grid.height {
            return None;
        }
        self.bands
            .get(band)
            .and_then(|cells| cells[row * self.grid.width + col])
    }

    /// Value of the cell containing the point (nearest-cell sampling)
    pub fn sample(&self, band: &str, lon: f64, lat: f64) -> Option<f64> {
        let (col, row) = self.grid.cell_at(lon, lat)?;
        self.value(band, col, row)
    }

    /// Keep only the named bands, `None` when any is absent
    pub fn select(&self, bands: &[String]) -> Option<Raster> {
        let mut selected = Raster::new(self.grid);
        for band in bands {
            selected
                .bands
                .insert(band.clone(), self.bands.get(band)?.clone());
        }
        Some(selected)
    }

    /// Apply a linear transform to the listed bands, masked cells stay masked
    pub fn rescale(&self, rescale: LinearRescale, bands: &[String]) -> Raster {
        let mut out = self.clone();
        for band in bands {
            if let Some(cells) = out.bands.get_mut(band) {
                for cell in cells.iter_mut() {
                    *cell = cell.map(|v| rescale.apply(v));
                }
            }
        }
        out
    }

    /// Crop to the region's bounding box and mask cells whose centres fall outside
    /// the region. `None` when the grid does not overlap the region.
    pub fn clip(&self, region: &Region) -> Option<Raster> {
        let grid = self.grid;
        let bounds = region.bounds();

        let col_start = ((bounds.min().x - grid.west) / grid.cell_size).floor().max(0.0) as usize;
        let col_end = (((bounds.max().x - grid.west) / grid.cell_size).ceil().max(0.0) as usize)
            .min(grid.width);
        let row_start = ((grid.north - bounds.max().y) / grid.cell_size).floor().max(0.0) as usize;
        let row_end = (((grid.north - bounds.min().y) / grid.cell_size).ceil().max(0.0) as usize)
            .min(grid.height);

        if col_start >= col_end || row_start >= row_end {
            return None;
        }

        let cropped = GridSpec {
            west: grid.west + col_start as f64 * grid.cell_size,
            north: grid.north - row_start as f64 * grid.cell_size,
            cell_size: grid.cell_size,
            width: col_end - col_start,
            height: row_end - row_start,
        };

        let inside: Vec<bool> = (0..cropped.height)
            .flat_map(|row| (0..cropped.width).map(move |col| (col, row)))
            .map(|(col, row)| {
                let (lon, lat) = cropped.cell_center(col, row);
                region.contains(lon, lat)
            })
            .collect();

        let mut clipped = Raster::new(cropped);
        for (name, cells) in &self.bands {
            let mut out = Vec::with_capacity(cropped.len());
            for row in 0..cropped.height {
                for col in 0..cropped.width {
                    let source = (row + row_start) * grid.width + (col + col_start);
                    let keep = inside[row * cropped.width + col];
                    out.push(if keep { cells[source] } else { None });
                }
            }
            clipped.bands.insert(name.clone(), out);
        }
        Some(clipped)
    }

    /// Unmasked values of the cells whose footprint touches the region
    pub fn values_under(&self, band: &str, region: &Region) -> Vec<f64> {
        let Some(cells) = self.bands.get(band) else {
            return Vec::new();
        };
        let grid = self.grid;
        (0..grid.height)
            .flat_map(|row| (0..grid.width).map(move |col| (col, row)))
            .filter(|&(col, row)| {
                let west = grid.west + col as f64 * grid.cell_size;
                let north = grid.north - row as f64 * grid.cell_size;
                region.intersects_rect(Rect::new(
                    (west, north - grid.cell_size),
                    (west + grid.cell_size, north),
                ))
            })
            .filter_map(|(col, row)| cells[row * grid.width + col])
            .collect()
    }

    /// Mask every cell of `band` for which the predicate is false
    pub fn mask_where(&self, band: &str, keep: impl Fn(f64) -> bool) -> Raster {
        let mut out = self.clone();
        if let Some(cells) = out.bands.get_mut(band) {
            for cell in cells.iter_mut() {
                if !cell.is_some_and(&keep) {
                    *cell = None;
                }
            }
        }
        out
    }

    pub fn stats(&self, band: &str) -> Option<BandStats> {
        let cells = self.bands.get(band)?;
        let values: Vec<f64> = cells.iter().flatten().copied().collect();
        Some(BandStats {
            valid: values.len(),
            masked: cells.len() - values.len(),
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
            mean: ReducerKind::Mean.reduce(values.iter().copied()),
        })
    }
}

/// Pixel-wise reduction across a stack of rasters sharing one grid.
///
/// Masked cells are skipped; a cell masked in every layer stays masked.
/// Returns `Ok(None)` for an empty stack.
pub fn reduce_temporal(
    stack: &[Raster],
    bands: &[String],
    reducer: ReducerKind,
) -> Result<Option<Raster>> {
    let Some(first) = stack.first() else {
        return Ok(None);
    };
    let grid = first.grid;
    if let Some(other) = stack.iter().find(|r| r.grid != grid) {
        return Err(AnalysisError::configuration(format!(
            "cannot reduce rasters on different grids: {:?} vs {:?}",
            grid, other.grid
        )));
    }

    let mut reduced = Raster::new(grid);
    for band in bands {
        let layers: Vec<&[Option<f64>]> = stack.iter().filter_map(|r| r.band(band)).collect();
        let cells = (0..grid.len())
            .map(|i| reducer.reduce(layers.iter().filter_map(|layer| layer[i])))
            .collect();
        reduced.bands.insert(band.clone(), cells);
    }
    Ok(Some(reduced))
}

/// Spatial reduction of one band to a scalar over the region.
///
/// The region's bounding box is resampled at `scale_m`; every target cell whose
/// centre lies in the region contributes the source value at that centre. When
/// the target grid exceeds `max_pixels` the scale is doubled until it fits if
/// `best_effort` is set, otherwise the reduction fails. A region too thin for
/// any target centre to land in it falls back to the source cells under it.
pub fn reduce_region(
    raster: &Raster,
    band: &str,
    region: &Region,
    reducer: ReducerKind,
    scale_m: f64,
    max_pixels: u64,
    best_effort: bool,
) -> Result<Option<f64>> {
    if !(scale_m.is_finite() && scale_m > 0.0) {
        return Err(AnalysisError::configuration(format!(
            "reduction scale must be positive, got {}",
            scale_m
        )));
    }
    if max_pixels == 0 {
        return Err(AnalysisError::configuration("max_pixels must be at least 1"));
    }

    let bounds = region.bounds();
    let width_deg = bounds.max().x - bounds.min().x;
    let height_deg = bounds.max().y - bounds.min().y;

    let mut step = scale_m / METERS_PER_DEGREE;
    let (cols, rows) = loop {
        let cols = ((width_deg / step).ceil() as u64).max(1);
        let rows = ((height_deg / step).ceil() as u64).max(1);
        let pixels = cols.saturating_mul(rows);
        if pixels <= max_pixels {
            break (cols, rows);
        }
        if !best_effort {
            return Err(AnalysisError::backend(
                "reduce_region",
                format!(
                    "{} pixels at {:.0}m exceeds the ceiling of {}",
                    pixels,
                    step * METERS_PER_DEGREE,
                    max_pixels
                ),
            ));
        }
        step *= 2.0;
        debug!(
            "Best effort: coarsening reduction scale to {:.0}m",
            step * METERS_PER_DEGREE
        );
    };

    let mut values = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let lon = bounds.min().x + (col as f64 + 0.5) * step;
            let lat = bounds.max().y - (row as f64 + 0.5) * step;
            if region.contains(lon, lat) {
                if let Some(value) = raster.sample(band, lon, lat) {
                    values.push(value);
                }
            }
        }
    }
    if values.is_empty() {
        values = raster.values_under(band, region);
    }

    Ok(reducer.reduce(values))
}
