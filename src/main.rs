//! memstats CLI
//!
//! # Usage
//!
//! ```bash
//! # Estimate non-model memory from a traced graph
//! memstats estimate run.yaml
//!
//! # Write results elsewhere and show the backward liveness trace
//! memstats estimate run.yaml --output stats.txt --trace
//!
//! # Validate config
//! memstats validate run.yaml --detailed
//!
//! # Show module boundaries
//! memstats info run.yaml --format json
//! ```

use clap::Parser;
use entrenar_memstats::cli::{init_tracing, run_command, Cli, LogLevel};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(LogLevel::from_flags(cli.verbose, cli.quiet));

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
