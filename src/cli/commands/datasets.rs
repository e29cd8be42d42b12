//! Catalog listing

use crate::catalog::Catalog;
use crate::cli::args::{DatasetsArgs, OutputFormat};
use crate::error::Result;
use colored::*;

pub fn run_datasets(args: &DatasetsArgs) -> Result<()> {
    let catalog = Catalog::standard();

    match args.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(catalog.datasets())?),
        OutputFormat::Human => {
            println!("{}", "Available datasets:".bright_green().bold());
            for (i, dataset) in catalog.datasets().iter().enumerate() {
                println!(
                    "  {} {} {}",
                    (i + 1).to_string().bright_yellow().bold(),
                    dataset.id.bright_white(),
                    format!("({})", dataset.title).dimmed()
                );
                for band in &dataset.bands {
                    let reducers: Vec<&str> = band.reducers.iter().map(|r| r.as_str()).collect();
                    println!(
                        "      {} [{}] reducers: {}",
                        band.name.bright_cyan(),
                        band.unit,
                        reducers.join(", ")
                    );
                }
                if let Some(property) = &dataset.cloud_property {
                    println!("      cloud filter on {}", property);
                }
            }
        }
    }
    Ok(())
}
