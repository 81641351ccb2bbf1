//! Branchstack CLI Binary
//!
//! Command-line interface for branching conversations over a local sled store.

use anyhow::Context;
use branchstack::cli::{map_error, Cli, RunContext};
use branchstack::config::{BranchstackConfig, ConfigLoader};
use branchstack::logging::{init_logging, LoggingConfig};
use clap::Parser;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    let logging_config = build_logging_config(&cli, &config);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Branchstack CLI starting");

    let runtime = match tokio::runtime::Runtime::new().context("Failed to create runtime") {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    let result = runtime.block_on(async {
        let context = RunContext::new(config, cli.offline)?;
        context.execute(&cli.command).await
    });

    match result {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

/// Effective config: explicit file or layered load, then the `--store` override.
fn load_config(cli: &Cli) -> anyhow::Result<BranchstackConfig> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => ConfigLoader::load(&cli.workspace).context("Failed to load configuration")?,
    };
    if let Some(store) = &cli.store {
        config.storage.path = store.clone();
    }
    Ok(config)
}

/// CLI flags override the config file, which overrides defaults.
fn build_logging_config(cli: &Cli, config: &BranchstackConfig) -> LoggingConfig {
    let mut logging = config.logging.clone();

    if cli.quiet {
        logging.enabled = false;
    }
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Some(level) = &cli.log_level {
        logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        logging.format = format.clone();
    }
    if let Some(output) = &cli.log_output {
        logging.output = output.clone();
    }
    if let Some(file) = &cli.log_file {
        logging.file = file.clone();
    }

    logging
}
