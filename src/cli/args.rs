//! Command-line argument definitions
//!
//! The CLI is defined with the clap derive API: `run` executes the full
//! analysis, `buckets` previews the monthly bucketing of a window and
//! `datasets` lists the catalog.

use crate::error::{AnalysisError, Result};
use crate::export::TableFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Monthly trace-gas series and fire-period composites over a study region
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bushfire_atmos",
    version,
    about = "Monthly CO/NO2 series and fire-period composites over a study region",
    long_about = "Builds monthly carbon monoxide and nitrogen dioxide column series over a \
                  study region, composites aerosol, surface reflectance and fire radiative power \
                  over the peak fire period, and exports the charts and map layers."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run the full analysis against a scene catalog
    Run(RunArgs),
    /// Show the monthly buckets a window splits into
    Buckets(BucketsArgs),
    /// List the datasets and bands the analysis knows about
    Datasets(DatasetsArgs),
}

#[derive(Debug, Clone, Parser)]
pub struct RunArgs {
    /// Directory of exported scene collections (one JSON file per collection)
    ///
    /// Defaults to `<data dir>/bushfire_atmos/catalog`.
    #[arg(long = "catalog", value_name = "DIR")]
    pub catalog: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// JSON configuration file. If not specified, looks for
    /// `<config dir>/bushfire_atmos/config.json`.
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (JSON format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Output directory for chart tables and map layers
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        default_value = "output",
        help = "Output directory for charts and layers"
    )]
    pub output_path: PathBuf,

    /// Table format for the chart series
    #[arg(long = "table-format", value_enum, default_value = "parquet")]
    pub table_format: TableFormat,

    /// Concurrent backend queries per series
    #[arg(short = 'j', long = "workers", value_name = "COUNT")]
    pub workers: Option<usize>,

    /// Reduction scale in metres for the monthly areal means
    #[arg(long = "scale", value_name = "METRES")]
    pub scale_m: Option<f64>,

    /// Retries after a failed backend query
    #[arg(long = "max-retries", value_name = "COUNT")]
    pub max_retries: Option<usize>,

    /// Run the analysis without writing any files
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Output format for the summary report
    #[arg(
        long = "output-format",
        value_enum,
        default_value = "human",
        help = "Output format for the summary report"
    )]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Parser)]
pub struct BucketsArgs {
    /// Window start (YYYY-MM-DD)
    #[arg(long = "start", value_name = "DATE", default_value = "2019-01-01")]
    pub start: String,

    /// Window end, exclusive (YYYY-MM-DD)
    #[arg(long = "end", value_name = "DATE", default_value = "2021-01-01")]
    pub end: String,

    #[arg(long = "output-format", value_enum, default_value = "human")]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Parser)]
pub struct DatasetsArgs {
    #[arg(long = "output-format", value_enum, default_value = "human")]
    pub output_format: OutputFormat,
}

/// Output format options for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON format for scripting
    Json,
}

impl RunArgs {
    /// Check argument consistency before any work starts
    pub fn validate(&self) -> Result<()> {
        if let Some(config_file) = &self.config_file {
            if !config_file.is_file() {
                return Err(AnalysisError::configuration(format!(
                    "Config file does not exist: {}",
                    config_file.display()
                )));
            }
        }
        if self.workers == Some(0) {
            return Err(AnalysisError::configuration(
                "Number of workers must be greater than 0",
            ));
        }
        if let Some(scale) = self.scale_m {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(AnalysisError::configuration(format!(
                    "Scale must be a positive number of metres, got {}",
                    scale
                )));
            }
        }
        Ok(())
    }

    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Progress bars only in interactive human mode
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.output_format == OutputFormat::Human
    }
}
