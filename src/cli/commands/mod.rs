//! Command implementations for the CLI
//!
//! Each subcommand lives in its own module:
//! - `run`: full analysis with chart and layer export
//! - `buckets`: monthly bucketing preview for a window
//! - `datasets`: catalog listing

pub mod buckets;
pub mod datasets;
pub mod run;
pub mod shared;

use crate::cli::args::{Args, Commands};
use crate::error::{AnalysisError, Result};
use tokio_util::sync::CancellationToken;

/// Dispatch to the subcommand handler
pub async fn run(args: Args, cancel: CancellationToken) -> Result<()> {
    match args.command {
        Some(Commands::Run(run_args)) => run::run_analysis(run_args, cancel).await.map(|_| ()),
        Some(Commands::Buckets(buckets_args)) => buckets::run_buckets(&buckets_args),
        Some(Commands::Datasets(datasets_args)) => datasets::run_datasets(&datasets_args),
        None => Err(AnalysisError::configuration("no command given")),
    }
}
