//! Command execution.
//!
//! Config commands work on the config file alone. Every other command binds to
//! the engine through [`EngineSession`], runs one or more proxy operations and
//! releases the binding when the session drops.

mod config;
mod session;

pub use session::EngineSession;

use crate::cli::Command;
use crate::error::CliError;
use crate::output::CommandOutput;

use models::{SyncAttachmentState, SyncOverallResult, SyncProgressState};
use common::ErrorLocation;
use sync_client_core::config::SyncClientConfig;
use sync_client_core::proxy::SyncServiceProxy;

use std::panic::Location;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use log::{debug, info};

/// Run `command` against the config in `config_dir`.
///
/// # Errors
///
/// Returns [`CliError`] if the config cannot be loaded, the engine cannot be
/// reached or an engine call fails.
pub fn run(command: &Command, config_dir: &Path) -> Result<CommandOutput, CliError> {
    if let Command::Config(config_command) = command {
        return config::run(config_command, config_dir);
    }

    let config = SyncClientConfig::load(config_dir)?;
    let session = EngineSession::connect(&config)?;

    execute(command, &session)
}

/// Run an engine command through a bound proxy.
#[track_caller]
pub fn execute(command: &Command, proxy: &SyncServiceProxy) -> Result<CommandOutput, CliError> {
    let output = match command {
        Command::Status { app_name } => CommandOutput::Status {
            app_name: app_name.clone(),
            status: proxy.get_status(app_name)?,
        },
        Command::Sync {
            app_name,
            attachments,
            wait,
            poll_ms,
        } => sync(
            proxy,
            app_name,
            *attachments,
            wait.then(|| Duration::from_millis(*poll_ms)),
        )?,
        Command::Reset {
            app_name,
            attachments,
        } => CommandOutput::Reset {
            app_name: app_name.clone(),
            attachments: *attachments,
            accepted: proxy.reset_server(app_name, *attachments)?,
        },
        Command::Progress { app_name } => CommandOutput::Progress {
            app_name: app_name.clone(),
            progress: proxy.get_progress(app_name)?,
        },
        Command::Message { app_name } => CommandOutput::Message {
            app_name: app_name.clone(),
            message: proxy.get_update_message(app_name)?,
        },
        Command::Result { app_name } => CommandOutput::Result {
            app_name: app_name.clone(),
            result: proxy.get_sync_result(app_name)?,
        },
        Command::Config(_) => {
            return Err(CliError::InvalidArgument {
                message: "Config commands do not use the sync engine".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    };

    Ok(output)
}

fn sync(
    proxy: &SyncServiceProxy,
    app_name: &str,
    attachments: SyncAttachmentState,
    poll_interval: Option<Duration>,
) -> Result<CommandOutput, CliError> {
    let accepted = proxy.start_sync(app_name, attachments)?;
    info!("Sync for {app_name} {}", if accepted { "accepted" } else { "refused" });

    let result = match poll_interval {
        Some(interval) if accepted => Some(wait_for_completion(proxy, app_name, interval)?),
        _ => None,
    };

    Ok(CommandOutput::Sync {
        app_name: app_name.to_string(),
        attachments,
        accepted,
        result,
    })
}

/// Poll until the engine leaves the syncing state, logging progress changes,
/// then fetch the session result.
fn wait_for_completion(
    proxy: &SyncServiceProxy,
    app_name: &str,
    interval: Duration,
) -> Result<SyncOverallResult, CliError> {
    let mut last_progress = None;
    let mut last_message = String::new();

    loop {
        let status = proxy.get_status(app_name)?;
        let progress = proxy.get_progress(app_name)?;

        if last_progress != Some(progress) {
            info!("{app_name}: {progress}");
            last_progress = Some(progress);
        }

        let message = proxy.get_update_message(app_name)?;
        if !message.is_empty() && message != last_message {
            info!("{app_name}: {message}");
            last_message = message;
        }

        if !status.is_active() && !is_running(progress) {
            debug!("{app_name} finished with status {status}");
            break;
        }

        sleep(interval);
    }

    Ok(proxy.get_sync_result(app_name)?)
}

fn is_running(progress: SyncProgressState) -> bool {
    !matches!(
        progress,
        SyncProgressState::Inactive | SyncProgressState::Finished
    )
}
