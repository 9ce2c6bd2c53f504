//! coshell CLI binary

use anyhow::Context;
use clap::Parser;
use coshell::logging::{init_logging, LoggingConfig};
use coshell::tooling::cli::{Cli, CliContext};
use std::process;

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let context = CliContext::new(cli.workspace.clone(), cli.config.clone())
        .context("loading configuration")?;

    let logging = logging_overrides(&cli, context.config().logging.clone());
    init_logging(Some(&logging)).context("initialising logging")?;

    let output = context.execute(&cli.command)?;
    println!("{}", output);
    Ok(())
}

/// CLI flags win over the config file.
fn logging_overrides(cli: &Cli, mut logging: LoggingConfig) -> LoggingConfig {
    if let Some(level) = &cli.log_level {
        logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        logging.format = format.clone();
    }
    if let Some(output) = &cli.log_output {
        logging.output = output.clone();
    }
    if cli.log_file.is_some() {
        logging.file = cli.log_file.clone();
    }
    logging
}
