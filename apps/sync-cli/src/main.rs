use sync_cli::cli::Cli;
use sync_cli::commands;
use sync_cli::error::CliError;
use sync_cli::logger::{self, DEFAULT_LEVEL, VERBOSE_LEVEL};

use sync_client_core::config::SyncClientConfig;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::debug;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e, cli.json);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config_dir = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => SyncClientConfig::default_dir()?,
    };
    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| default_log_dir(&config_dir));

    let level = if cli.verbose {
        VERBOSE_LEVEL
    } else {
        DEFAULT_LEVEL
    };
    logger::initialize(&log_dir, level)?;
    debug!("Using config directory {}", config_dir.display());

    let output = commands::run(&cli.command, &config_dir)?;
    println!("{}", output.render(cli.json)?);

    Ok(())
}

fn default_log_dir(config_dir: &Path) -> PathBuf {
    config_dir.join("logs")
}

fn report(error: &CliError, json: bool) {
    if json {
        match serde_json::to_string(error) {
            Ok(body) => eprintln!("{body}"),
            Err(_) => eprintln!("{error}"),
        }
    } else {
        eprintln!("{error}");
    }
}
