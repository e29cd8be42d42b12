//! Shared components for CLI commands

use crate::cli::args::RunArgs;
use crate::config::AnalysisConfig;
use crate::error::Result;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Set up structured logging on stderr
///
/// `RUST_LOG` takes precedence over the requested level.
pub fn setup_logging(log_level: &str, quiet: bool) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bushfire_atmos={}", log_level)));

    if quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load configuration using the layered approach (file -> env -> args)
pub fn load_configuration(args: &RunArgs) -> Result<AnalysisConfig> {
    let default_path = AnalysisConfig::default_config_path()
        .ok()
        .filter(|path| path.exists());
    let config_file = args.config_file.clone().or(default_path);

    if config_file.is_none() {
        info!("No config file found, using defaults and environment variables");
    }

    let mut config = AnalysisConfig::load_layered(config_file.as_deref())?;
    apply_cli_overrides(&mut config, args);
    config.validate()?;
    debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

/// Apply CLI argument overrides to configuration
pub fn apply_cli_overrides(config: &mut AnalysisConfig, args: &RunArgs) {
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(scale_m) = args.scale_m {
        config.reduction.scale_m = scale_m;
    }
    if let Some(max_retries) = args.max_retries {
        config.retry.max_retries = max_retries;
    }
}

/// Find the scene catalog directory
///
/// An explicit `--catalog` wins; otherwise `<data dir>/bushfire_atmos/catalog`.
/// The directory must hold at least one collection file.
pub fn locate_catalog(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    let catalog_dir = match explicit {
        Some(path) => path.to_path_buf(),
        None => dirs::data_dir()
            .context("Could not determine user data directory")?
            .join("bushfire_atmos")
            .join("catalog"),
    };

    if !catalog_dir.is_dir() {
        anyhow::bail!(
            "Catalog directory not found at {}. Pass --catalog or export scene collections there.",
            catalog_dir.display()
        );
    }

    let pattern = catalog_dir.join("*.json");
    let collections = glob::glob(&pattern.to_string_lossy())
        .context("Invalid catalog path")?
        .filter_map(|entry| entry.ok())
        .count();
    if collections == 0 {
        anyhow::bail!("No collection files (*.json) in {}", catalog_dir.display());
    }

    debug!(
        "Using catalog {} ({} collection files)",
        catalog_dir.display(),
        collections
    );
    Ok(catalog_dir)
}
