//! Full analysis run

use super::shared::{load_configuration, locate_catalog, setup_logging};
use crate::backend::{Backend, MemoryBackend, RetryingBackend};
use crate::catalog::Catalog;
use crate::cli::args::{OutputFormat, RunArgs};
use crate::error::{AnalysisError, Result};
use crate::export::ExportRenderer;
use crate::pipeline::AnalysisPipeline;
use crate::presentation::RecordingRenderer;
use crate::report::SummaryReport;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub async fn run_analysis(args: RunArgs, cancel: CancellationToken) -> Result<SummaryReport> {
    setup_logging(args.get_log_level(), args.quiet)?;
    info!("Starting bushfire_atmos analysis");
    debug!("Command line arguments: {:?}", args);

    args.validate()?;
    let config = load_configuration(&args)?;

    let catalog_dir = locate_catalog(args.catalog.as_deref()).map_err(|e| {
        AnalysisError::catalog(args.catalog.clone().unwrap_or_default(), format!("{:#}", e))
    })?;

    let catalog = Arc::new(Catalog::standard());
    let memory = MemoryBackend::load_catalog(&catalog_dir)?;
    let absent: Vec<&str> = catalog
        .datasets()
        .iter()
        .map(|d| d.id.as_str())
        .filter(|id| memory.collection(id).is_none())
        .collect();
    if !absent.is_empty() {
        return Err(AnalysisError::catalog(
            &catalog_dir,
            format!("missing collections: {}", absent.join(", ")),
        ));
    }

    let backend: Arc<dyn Backend> = Arc::new(RetryingBackend::new(memory, config.retry.clone()));
    let pipeline =
        AnalysisPipeline::new(config, backend, catalog).with_progress(args.show_progress());

    let report = if args.dry_run {
        let mut renderer = RecordingRenderer::new();
        let report = pipeline.run(&mut renderer, &cancel).await?;
        info!(
            "Dry run: {} charts and {} layers built, nothing written",
            renderer.charts.len(),
            renderer.layers.len()
        );
        report
    } else {
        let mut renderer = ExportRenderer::new(&args.output_path, args.table_format)?;
        let report = pipeline.run(&mut renderer, &cancel).await?;
        info!(
            "Wrote {} files to {}",
            renderer.written_files().len(),
            renderer.output_dir().display()
        );
        report
    };

    match args.output_format {
        OutputFormat::Human => report.print_human(),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(report)
}
