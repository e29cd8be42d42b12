//! Monthly bucketing preview

use crate::buckets::{Cadence, list_buckets};
use crate::cli::args::{BucketsArgs, OutputFormat};
use crate::error::Result;
use crate::models::TimeWindow;
use colored::*;

pub fn run_buckets(args: &BucketsArgs) -> Result<()> {
    let window = TimeWindow::parse(&args.start, &args.end)?;
    let buckets = list_buckets(&window, Cadence::Monthly)?;

    match args.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&buckets)?),
        OutputFormat::Human => {
            println!(
                "{} {} ({} months)",
                "Window:".bright_green().bold(),
                window,
                buckets.len().to_string().bright_white().bold()
            );
            for (i, bucket) in buckets.iter().enumerate() {
                println!(
                    "  {} {}  {}",
                    format!("{:>3}.", i + 1).bright_yellow(),
                    bucket.label().bright_white(),
                    bucket.window()
                );
            }
        }
    }
    Ok(())
}
