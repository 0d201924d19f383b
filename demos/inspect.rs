use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pkgscan::{Validator, ValidatorOptions};
use tracing_subscriber::EnvFilter;

/// Validate PS4 PKG files and print what could be read from them.
#[derive(Parser)]
struct Args {
    /// Package files to check.
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Print JSON instead of the text report.
    #[arg(long)]
    json: bool,
    /// Only scan this many leading bytes for trophy markers.
    #[arg(long)]
    trophy_scan_limit: Option<usize>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let validator =
        Validator::new(ValidatorOptions::new().trophy_scan_limit(args.trophy_scan_limit));
    let results = validator.validate_many(&args.files);

    if args.json {
        match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("failed to serialize results: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        for result in &results {
            println!("{result}");
        }
    }

    if results.iter().all(|r| r.is_valid) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
