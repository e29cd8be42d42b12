//! Bushfire atmosphere analysis
//!
//! Monthly carbon monoxide and nitrogen dioxide column series over a study
//! region, and fire-period composites of aerosol index, surface reflectance and
//! fire radiative power, computed through a geospatial imagery backend.
//!
//! This library provides:
//! - Region, time window and monthly bucket types with validation
//! - A two-phase backend adapter: pure query specifications and an async `execute`
//! - Monthly aggregation with bounded concurrency and ordered reassembly
//! - Period composites with band contracts and sensor rescaling
//! - Chart and map-layer rendering through a `Renderer` trait, with file export
//! - A summary report listing every month and layer that had no imagery

pub mod aggregator;
pub mod backend;
pub mod buckets;
pub mod catalog;
pub mod compositor;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod presentation;
pub mod raster;
pub mod report;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use aggregator::{MonthlyAggregator, MonthlySeries};
pub use backend::{Backend, MemoryBackend, QueryResult, QuerySpec, RetryPolicy, RetryingBackend};
pub use catalog::Catalog;
pub use compositor::PeriodCompositor;
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
pub use models::{AggregatedSample, MonthlyBucket, RasterComposite, ReducerKind, Region, TimeWindow};
pub use pipeline::AnalysisPipeline;
pub use presentation::{LineChart, MapLayer, MapView, RecordingRenderer, Renderer, VisParams};
pub use report::SummaryReport;
