//! Threadstore CLI Binary
//!
//! Command-line interface for inspecting and moderating comment threads.

use anyhow::Context;
use clap::Parser;
use std::process;
use threadstore::logging::init_logging;
use threadstore::tooling::cli::{Cli, CliContext};

fn run(cli: Cli) -> anyhow::Result<String> {
    let config = CliContext::load_config(&cli.workspace, cli.config.as_deref())
        .context("Failed to load configuration")?;

    let logging = cli.logging_config(&config.logging);
    init_logging(Some(&logging)).context("Failed to initialize logging")?;

    let context = CliContext::from_config(&cli.workspace, config, cli.root.clone())
        .context("Failed to open comment storage")?;
    Ok(context.execute(&cli.command)?)
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
