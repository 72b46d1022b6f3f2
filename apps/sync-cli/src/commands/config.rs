use crate::cli::ConfigCommand;
use crate::error::CliError;
use crate::output::CommandOutput;

use common::ErrorLocation;
use sync_client_core::config::SyncClientConfig;

use std::panic::Location;
use std::path::Path;

use log::info;

#[track_caller]
pub fn run(command: &ConfigCommand, config_dir: &Path) -> Result<CommandOutput, CliError> {
    let path = SyncClientConfig::file_path(config_dir);

    match command {
        ConfigCommand::Show => {
            let config = SyncClientConfig::load(config_dir)?;
            Ok(CommandOutput::config(path, config))
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::Config {
                    message: format!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            let config = SyncClientConfig::default();
            config.save(config_dir)?;
            info!("Wrote default config to {}", path.display());

            Ok(CommandOutput::config(path, config))
        }
    }
}
