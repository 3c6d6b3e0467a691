//! ## vaktprov-cli
//! **Command line frontend for the conformance harness**
//! Runs the bundled packet processors against scenario files, compiles
//! scenarios into their checksummed form and inspects them without running.

use std::process::ExitCode;

use clap::Parser;

mod commands;
mod processors;

use commands::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match commands::run_command(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
