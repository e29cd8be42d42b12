use bushfire_atmos::AnalysisError;
use bushfire_atmos::cli::{args::Args, commands};
use clap::Parser;
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    let args = Args::parse();

    // No subcommand: show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        let cancellation_token = CancellationToken::new();

        let shutdown_signal = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("Failed to install CTRL+C signal handler: {}", e);
                std::future::pending::<()>().await;
            }
            cancellation_token.cancel();
        };

        tokio::select! {
            result = commands::run(args, cancellation_token.clone()) => result,
            _ = shutdown_signal => {
                eprintln!("\nReceived CTRL+C, shutting down gracefully...");
                Err(AnalysisError::Cancelled {
                    reason: "interrupted by user".to_string(),
                })
            }
        }
    });

    match result {
        Ok(()) => process::exit(0),
        Err(AnalysisError::Cancelled { reason }) => {
            eprintln!("Cancelled: {}", reason);
            process::exit(130);
        }
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("bushfire_atmos - Fire-season atmospheric analysis");
    println!("=================================================");
    println!();
    println!("Monthly CO and NO2 column series over a study region, plus aerosol,");
    println!("surface reflectance and fire radiative power composites for the peak");
    println!("fire period.");
    println!();
    println!("USAGE:");
    println!("    bushfire_atmos <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    run         Run the full analysis against a scene catalog");
    println!("    buckets     Show the monthly buckets a window splits into");
    println!("    datasets    List the datasets and bands the analysis uses");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("EXAMPLES:");
    println!("    bushfire_atmos run --catalog ./scenes --output ./output");
    println!("    bushfire_atmos run --catalog ./scenes --table-format csv -j 4 -v");
    println!("    bushfire_atmos buckets --start 2019-01-01 --end 2020-12-31");
    println!("    bushfire_atmos datasets --output-format json");
}
