//! Rendering of command results.
//!
//! Every command produces one [`CommandOutput`]. Human output uses `Display`;
//! `--json` prints the serde form tagged with the command name.

use crate::error::CliError;

use common::ErrorLocation;
use models::{SyncAttachmentState, SyncOverallResult, SyncProgressState, SyncStatus};
use sync_client_core::config::SyncClientConfig;

use std::fmt;
use std::panic::Location;
use std::path::PathBuf;

use serde::Serialize;

const REDACTED: &str = "<redacted>";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandOutput {
    Status {
        app_name: String,
        status: SyncStatus,
    },
    Sync {
        app_name: String,
        attachments: SyncAttachmentState,
        accepted: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<SyncOverallResult>,
    },
    Reset {
        app_name: String,
        attachments: SyncAttachmentState,
        accepted: bool,
    },
    Progress {
        app_name: String,
        progress: SyncProgressState,
    },
    Message {
        app_name: String,
        message: String,
    },
    Result {
        app_name: String,
        result: SyncOverallResult,
    },
    Config {
        path: PathBuf,
        config: SyncClientConfig,
    },
}

impl CommandOutput {
    /// Config output with the engine auth token masked.
    pub fn config(path: PathBuf, mut config: SyncClientConfig) -> Self {
        if config.engine.auth_token.is_some() {
            config.engine.auth_token = Some(REDACTED.to_string());
        }
        CommandOutput::Config { path, config }
    }

    /// Render for stdout.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Cli`] if JSON serialization fails.
    #[track_caller]
    pub fn render(&self, json: bool) -> Result<String, CliError> {
        if !json {
            return Ok(self.to_string());
        }

        serde_json::to_string_pretty(self).map_err(|e| CliError::Cli {
            message: format!("Failed to serialize output: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutput::Status { app_name, status } => write!(f, "{app_name}: {status}"),
            CommandOutput::Sync {
                app_name,
                attachments,
                accepted,
                result,
            } => {
                write!(
                    f,
                    "{app_name}: sync {} (attachments: {attachments})",
                    accepted_label(*accepted)
                )?;
                match result {
                    Some(result) => {
                        writeln!(f)?;
                        write_result(f, result)
                    }
                    None => Ok(()),
                }
            }
            CommandOutput::Reset {
                app_name,
                attachments,
                accepted,
            } => write!(
                f,
                "{app_name}: reset {} (attachments: {attachments})",
                accepted_label(*accepted)
            ),
            CommandOutput::Progress { app_name, progress } => {
                write!(f, "{app_name}: {progress}")
            }
            CommandOutput::Message { app_name, message } if message.is_empty() => {
                write!(f, "{app_name}: (no message)")
            }
            CommandOutput::Message { app_name, message } => write!(f, "{app_name}: {message}"),
            CommandOutput::Result { app_name, result } => {
                writeln!(f, "{app_name}:")?;
                write_result(f, result)
            }
            CommandOutput::Config { path, config } => {
                writeln!(f, "# {}", path.display())?;
                let body = serde_json::to_string_pretty(config).map_err(|_| fmt::Error)?;
                f.write_str(&body)
            }
        }
    }
}

fn accepted_label(accepted: bool) -> &'static str {
    if accepted { "accepted" } else { "refused" }
}

fn write_result(f: &mut fmt::Formatter<'_>, result: &SyncOverallResult) -> fmt::Result {
    write!(f, "outcome: {}", result.app_outcome())?;

    let tables = result.table_level_results();
    if tables.is_empty() {
        return write!(f, "\n(no tables)");
    }

    let width = tables
        .iter()
        .map(|table| table.table_id().len())
        .max()
        .unwrap_or(0)
        .max("TABLE".len());

    write!(
        f,
        "\n{:<width$}  {:<24}  {:>7}  {:>7}  {:>9}  MESSAGE",
        "TABLE", "OUTCOME", "PULLED", "PUSHED", "CONFLICTS"
    )?;
    for table in tables {
        let counters = table.counters();
        write!(
            f,
            "\n{:<width$}  {:<24}  {:>7}  {:>7}  {:>9}  {}",
            table.table_id(),
            table.sync_outcome().as_str(),
            counters.rows_pulled,
            counters.rows_pushed,
            counters.rows_conflicted,
            table.message().unwrap_or("-"),
        )?;
    }

    Ok(())
}
