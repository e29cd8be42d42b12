//! Run summary
//!
//! Collects what a run produced: region and windows, per-series coverage with the
//! explicit list of months that had no imagery, the layers that were rendered and
//! those that could not be built.

use crate::error::Result;
use crate::models::{ReducerKind, Region, TimeWindow};
use crate::presentation::{LineChart, MapLayer};
use colored::*;
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub title: String,
    pub collection: String,
    pub band: String,
    pub unit: String,
    pub buckets: usize,
    pub present: usize,
    /// Labels of months with no imagery
    pub missing: Vec<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl SeriesSummary {
    pub fn from_chart(chart: &LineChart) -> Self {
        let values: Vec<f64> = chart.samples.iter().filter_map(|s| s.value).collect();
        Self {
            title: chart.title.clone(),
            collection: chart.collection.clone(),
            band: chart.band.clone(),
            unit: chart.unit.clone(),
            buckets: chart.samples.len(),
            present: values.len(),
            missing: chart.gaps().into_iter().map(String::from).collect(),
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummary {
    pub name: String,
    pub collection: String,
    pub window: TimeWindow,
    pub reducer: ReducerKind,
    pub valid_cells: usize,
}

impl LayerSummary {
    pub fn from_layer(layer: &MapLayer) -> Self {
        Self {
            name: layer.name.clone(),
            collection: layer.collection.clone(),
            window: layer.window,
            reducer: layer.reducer,
            valid_cells: layer.valid_cells(),
        }
    }
}

/// A layer that was requested but not produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingLayer {
    pub name: String,
    pub collection: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub region_polygons: usize,
    pub region_vertices: usize,
    pub region_area_deg2: f64,
    pub time_series: TimeWindow,
    pub fire_period: TimeWindow,
    pub aerosol_window: TimeWindow,
    pub series: Vec<SeriesSummary>,
    pub layers: Vec<LayerSummary>,
    pub missing_layers: Vec<MissingLayer>,
    pub datasets: Vec<String>,
    pub elapsed_ms: u128,
}

impl SummaryReport {
    pub fn new(
        region: &Region,
        time_series: TimeWindow,
        fire_period: TimeWindow,
        aerosol_window: TimeWindow,
    ) -> Self {
        Self {
            region_polygons: region.polygon_count(),
            region_vertices: region.vertex_count(),
            region_area_deg2: region.area_deg2(),
            time_series,
            fire_period,
            aerosol_window,
            series: Vec::new(),
            layers: Vec::new(),
            missing_layers: Vec::new(),
            datasets: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub fn add_dataset(&mut self, id: &str) {
        if !self.datasets.iter().any(|d| d == id) {
            self.datasets.push(id.to_string());
        }
    }

    pub fn total_missing_months(&self) -> usize {
        self.series.iter().map(|s| s.missing.len()).sum()
    }

    /// True when every series month and every layer was produced
    pub fn is_complete(&self) -> bool {
        self.total_missing_months() == 0 && self.missing_layers.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n{}", "Analysis Summary".bright_green().bold());
        let _ = writeln!(
            out,
            "  {} {} polygon(s), {} vertices, {:.3} deg²",
            "Region:".bright_cyan(),
            self.region_polygons,
            self.region_vertices,
            self.region_area_deg2
        );
        let _ = writeln!(
            out,
            "  {} {}",
            "Time series:".bright_cyan(),
            self.time_series.to_string().bright_white()
        );
        let _ = writeln!(
            out,
            "  {} {}  (aerosol {})",
            "Fire period:".bright_cyan(),
            self.fire_period.to_string().bright_white(),
            self.aerosol_window
        );

        for series in &self.series {
            let _ = writeln!(
                out,
                "  {} {}/{} months",
                format!("{}:", series.title).bright_cyan(),
                series.present.to_string().bright_white().bold(),
                series.buckets
            );
            if let (Some(min), Some(max)) = (series.min, series.max) {
                let _ = writeln!(out, "    range {:.6} .. {:.6} {}", min, max, series.unit);
            }
            if !series.missing.is_empty() {
                let _ = writeln!(
                    out,
                    "    {} {}",
                    "no imagery:".bright_yellow(),
                    series.missing.join(", ")
                );
            }
        }

        let _ = writeln!(
            out,
            "  {} {}",
            "Layers:".bright_cyan(),
            self.layers.len().to_string().bright_white().bold()
        );
        for layer in &self.layers {
            let _ = writeln!(
                out,
                "    {} ({} {}, {} cells)",
                layer.name, layer.reducer, layer.window, layer.valid_cells
            );
        }
        for missing in &self.missing_layers {
            let _ = writeln!(
                out,
                "    {} {}: {}",
                "missing".bright_red(),
                missing.name,
                missing.reason
            );
        }
        let _ = writeln!(
            out,
            "  {} {}ms",
            "Time elapsed:".bright_cyan(),
            self.elapsed_ms.to_string().bright_white()
        );
        out
    }

    pub fn print_human(&self) {
        print!("{}", self.render_text());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AggregatedSample;
    use chrono::NaiveDate;

    fn window(start: (i32, u32), end: (i32, u32)) -> TimeWindow {
        TimeWindow {
            start: NaiveDate::from_ymd_opt(start.0, start.1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(end.0, end.1, 1).unwrap(),
        }
    }

    fn report() -> SummaryReport {
        let region =
            Region::polygon(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]).unwrap();
        SummaryReport::new(
            &region,
            window((2019, 1), (2021, 1)),
            window((2019, 12), (2020, 1)),
            window((2019, 12), (2020, 1)),
        )
    }

    #[test]
    fn test_series_summary_lists_missing_months() {
        let chart = LineChart {
            title: "NO2".to_string(),
            collection: "C".to_string(),
            band: "b".to_string(),
            unit: "mol/m^2".to_string(),
            samples: vec![
                AggregatedSample {
                    label: "2020-01".to_string(),
                    window: window((2020, 1), (2020, 2)),
                    value: Some(2.0),
                },
                AggregatedSample {
                    label: "2020-02".to_string(),
                    window: window((2020, 2), (2020, 3)),
                    value: None,
                },
                AggregatedSample {
                    label: "2020-03".to_string(),
                    window: window((2020, 3), (2020, 4)),
                    value: Some(1.0),
                },
            ],
        };

        let summary = SeriesSummary::from_chart(&chart);
        assert_eq!(summary.buckets, 3);
        assert_eq!(summary.present, 2);
        assert_eq!(summary.missing, vec!["2020-02".to_string()]);
        assert_eq!(summary.min, Some(1.0));
        assert_eq!(summary.max, Some(2.0));

        let mut report = report();
        report.series.push(summary);
        assert_eq!(report.total_missing_months(), 1);
        assert!(!report.is_complete());
        assert!(report.render_text().contains("2020-02"));
    }

    #[test]
    fn test_report_json_and_datasets() {
        let mut report = report();
        report.add_dataset("A");
        report.add_dataset("A");
        report.add_dataset("B");
        report.missing_layers.push(MissingLayer {
            name: "Aerosol".to_string(),
            collection: "A".to_string(),
            reason: "no imagery".to_string(),
        });

        assert_eq!(report.datasets, vec!["A".to_string(), "B".to_string()]);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["region_vertices"], 4);
        assert_eq!(json["time_series"]["start"], "2019-01-01");
        assert_eq!(json["missing_layers"][0]["name"], "Aerosol");
    }
}
