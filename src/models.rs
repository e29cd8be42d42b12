//! Core data structures for the analysis.
//!
//! Defines the study region, half-open time windows, monthly buckets, reducer
//! kinds and the sample/composite values produced by the aggregation steps.

use crate::error::{AnalysisError, Result};
use crate::raster::Raster;
use chrono::{Months, NaiveDate};
use geo::{Area, BoundingRect, Contains, Intersects, Validation};
use geo_types::{LineString, MultiPolygon, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Study area of interest, one or more polygons in (lon, lat) degrees
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    shape: MultiPolygon<f64>,
    bounds: Rect<f64>,
}

impl Region {
    /// Build a region from a single vertex ring
    pub fn polygon(vertices: &[(f64, f64)]) -> Result<Self> {
        Self::from_rings(&[vertices.to_vec()])
    }

    /// Build a multi-polygon region, one exterior ring per polygon.
    ///
    /// Open rings are closed automatically and consecutive repeated vertices are
    /// dropped. Rings with fewer than three distinct vertices, zero area or
    /// crossing edges are rejected.
    pub fn from_rings(rings: &[Vec<(f64, f64)>]) -> Result<Self> {
        if rings.is_empty() {
            return Err(AnalysisError::invalid_region("region has no polygons"));
        }

        let mut polygons = Vec::with_capacity(rings.len());
        for (index, ring) in rings.iter().enumerate() {
            if ring.iter().any(|(lon, lat)| !lon.is_finite() || !lat.is_finite()) {
                return Err(AnalysisError::invalid_region(format!(
                    "polygon {} has non-finite coordinates",
                    index
                )));
            }

            let mut distinct: Vec<(f64, f64)> = Vec::new();
            for vertex in ring {
                if !distinct.contains(vertex) {
                    distinct.push(*vertex);
                }
            }
            if distinct.len() < 3 {
                return Err(AnalysisError::invalid_region(format!(
                    "polygon {} has {} distinct vertices, need at least 3",
                    index,
                    distinct.len()
                )));
            }

            let mut vertices = ring.clone();
            vertices.dedup();

            // Polygon::new closes the exterior ring if needed
            let polygon = Polygon::new(LineString::from(vertices), vec![]);
            if polygon.unsigned_area() <= 0.0 {
                return Err(AnalysisError::invalid_region(format!(
                    "polygon {} has zero area",
                    index
                )));
            }
            if !polygon.is_valid() {
                return Err(AnalysisError::invalid_region(format!(
                    "polygon {} is self-intersecting",
                    index
                )));
            }
            polygons.push(polygon);
        }

        let shape = MultiPolygon::new(polygons);
        let bounds = shape
            .bounding_rect()
            .ok_or_else(|| AnalysisError::invalid_region("region has no extent"))?;

        Ok(Self { shape, bounds })
    }

    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    /// Bounding rectangle in degrees
    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// True when the point lies strictly inside the region
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.shape.contains(&Point::new(lon, lat))
    }

    /// True when the rectangle touches or overlaps the region
    pub fn intersects_rect(&self, rect: Rect<f64>) -> bool {
        self.shape.intersects(&rect)
    }

    pub fn polygon_count(&self) -> usize {
        self.shape.0.len()
    }

    /// Distinct vertex count, closing vertices excluded
    pub fn vertex_count(&self) -> usize {
        self.shape
            .0
            .iter()
            .map(|p| p.exterior().0.len().saturating_sub(1))
            .sum()
    }

    /// Planar area in square degrees
    pub fn area_deg2(&self) -> f64 {
        self.shape.unsigned_area()
    }
}

/// Half-open date interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    /// Parse a window from `YYYY-MM-DD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |value: &str| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
                AnalysisError::configuration(format!("invalid date '{}': {}", value, e))
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(AnalysisError::invalid_window(
                self.start,
                self.end,
                "end date must be after start date",
            ));
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

/// Statistic applied across an image stack or across a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReducerKind {
    Mean,
    Max,
}

impl ReducerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReducerKind::Mean => "mean",
            ReducerKind::Max => "max",
        }
    }

    /// Reduce a set of values, `None` when the set is empty
    pub fn reduce(&self, values: impl IntoIterator<Item = f64>) -> Option<f64> {
        let mut count = 0usize;
        let mut acc = match self {
            ReducerKind::Mean => 0.0,
            ReducerKind::Max => f64::NEG_INFINITY,
        };
        for value in values {
            count += 1;
            match self {
                ReducerKind::Mean => acc += value,
                ReducerKind::Max => acc = acc.max(value),
            }
        }
        match (count, self) {
            (0, _) => None,
            (n, ReducerKind::Mean) => Some(acc / n as f64),
            (_, ReducerKind::Max) => Some(acc),
        }
    }
}

impl fmt::Display for ReducerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One calendar month of a time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MonthlyBucket {
    pub year: i32,
    pub month: u32,
    window: TimeWindow,
}

impl MonthlyBucket {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            AnalysisError::configuration(format!("invalid month {}-{:02}", year, month))
        })?;
        let end = start.checked_add_months(Months::new(1)).ok_or_else(|| {
            AnalysisError::configuration(format!("month {}-{:02} out of range", year, month))
        })?;
        Ok(Self {
            year,
            month,
            window: TimeWindow { start, end },
        })
    }

    /// Absolute month number, `year * 12 + (month - 1)`
    pub fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    /// Bucket for an absolute month number
    pub fn from_ordinal(ordinal: i64) -> Result<Self> {
        let year = ordinal.div_euclid(12);
        let month = ordinal.rem_euclid(12) as u32 + 1;
        let year = i32::try_from(year)
            .map_err(|_| AnalysisError::configuration(format!("year {} out of range", year)))?;
        Self::new(year, month)
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Chart label, e.g. `2019-12`
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// One scalar statistic for one bucket; `value` is `None` when no imagery exists
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSample {
    pub label: String,
    pub window: TimeWindow,
    pub value: Option<f64>,
}

impl AggregatedSample {
    pub fn is_missing(&self) -> bool {
        self.value.is_none()
    }
}

/// Reduced, clipped image for a fixed window
#[derive(Debug, Clone, PartialEq)]
pub struct RasterComposite {
    pub collection: String,
    pub bands: Vec<String>,
    pub reducer: ReducerKind,
    pub window: TimeWindow,
    pub raster: Raster,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_region_auto_closes_ring() {
        let region = Region::polygon(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]).unwrap();
        assert_eq!(region.vertex_count(), 4);
        assert!((region.area_deg2() - 4.0).abs() < 1e-12);
        assert!(region.contains(1.0, 1.0));
        assert!(!region.contains(3.0, 1.0));
    }

    #[test]
    fn test_region_rejects_empty_and_degenerate() {
        assert!(matches!(
            Region::from_rings(&[]),
            Err(AnalysisError::InvalidRegion { .. })
        ));
        assert!(matches!(
            Region::polygon(&[(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]),
            Err(AnalysisError::InvalidRegion { .. })
        ));
        // collinear ring has no area
        assert!(matches!(
            Region::polygon(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 0.0)]),
            Err(AnalysisError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn test_region_rejects_bowtie() {
        let result = Region::polygon(&[(0.0, 0.0), (4.0, 4.0), (4.0, 0.0), (0.0, 2.0), (0.0, 0.0)]);
        match result {
            Err(AnalysisError::InvalidRegion { reason }) => {
                assert!(reason.contains("self-intersecting"))
            }
            other => panic!("Expected InvalidRegion, got {:?}", other),
        }
    }

    #[test]
    fn test_region_tolerates_repeated_vertices() {
        let region = Region::polygon(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (0.0, 1.0),
        ])
        .unwrap();
        assert_eq!(region.vertex_count(), 4);
        assert!((region.area_deg2() - 1.0).abs() < 1e-12);
        assert!(region.contains(0.5, 0.5));
    }

    #[test]
    fn test_multi_polygon_region() {
        let region = Region::from_rings(&[
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
            vec![(5.0, 5.0), (6.0, 5.0), (6.0, 6.0), (5.0, 6.0)],
        ])
        .unwrap();
        assert_eq!(region.polygon_count(), 2);
        assert!(region.contains(5.5, 5.5));
        assert!(!region.contains(3.0, 3.0));
        let bounds = region.bounds();
        assert_eq!(bounds.min().x, 0.0);
        assert_eq!(bounds.max().y, 6.0);
    }

    #[test]
    fn test_time_window_validation() {
        assert!(TimeWindow::new(date(2020, 1, 1), date(2020, 1, 2)).is_ok());
        assert!(matches!(
            TimeWindow::new(date(2020, 1, 1), date(2020, 1, 1)),
            Err(AnalysisError::InvalidWindow { .. })
        ));
        assert!(matches!(
            TimeWindow::parse("2020-02-01", "2020-01-01"),
            Err(AnalysisError::InvalidWindow { .. })
        ));
        assert!(matches!(
            TimeWindow::parse("2020-13-01", "2021-01-01"),
            Err(AnalysisError::Configuration { .. })
        ));
    }

    #[test]
    fn test_time_window_is_half_open() {
        let window = TimeWindow::parse("2019-12-15", "2020-01-15").unwrap();
        assert!(window.contains(date(2019, 12, 15)));
        assert!(window.contains(date(2020, 1, 14)));
        assert!(!window.contains(date(2020, 1, 15)));
        assert_eq!(window.days(), 31);
    }

    #[test]
    fn test_bucket_label_zero_padded() {
        assert_eq!(MonthlyBucket::new(2019, 12).unwrap().label(), "2019-12");
        assert_eq!(MonthlyBucket::new(2020, 1).unwrap().label(), "2020-01");
        assert!(MonthlyBucket::new(2020, 13).is_err());
    }

    #[test]
    fn test_bucket_window_spans_one_month() {
        let feb = MonthlyBucket::new(2020, 2).unwrap().window();
        assert_eq!(feb.start, date(2020, 2, 1));
        assert_eq!(feb.end, date(2020, 3, 1));

        let dec = MonthlyBucket::new(2019, 12).unwrap().window();
        assert_eq!(dec.end, date(2020, 1, 1));
    }

    #[test]
    fn test_bucket_ordinal_round_trip() {
        let bucket = MonthlyBucket::new(2019, 12).unwrap();
        let next = MonthlyBucket::from_ordinal(bucket.ordinal() + 1).unwrap();
        assert_eq!((next.year, next.month), (2020, 1));
    }

    #[test]
    fn test_reducer_kinds() {
        assert_eq!(ReducerKind::Mean.reduce([1.0, 2.0, 6.0]), Some(3.0));
        assert_eq!(ReducerKind::Max.reduce([1.0, 7.5, 6.0]), Some(7.5));
        assert_eq!(ReducerKind::Mean.reduce(std::iter::empty()), None);
        assert_eq!(ReducerKind::Max.reduce(std::iter::empty()), None);
    }
}
