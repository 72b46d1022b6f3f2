//! Command-line definition for `odk-sync`.

use models::SyncAttachmentState;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Drive the ODK sync engine from the command line.
#[derive(Debug, Parser)]
#[command(name = "odk-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding sync_client.json (defaults to the platform config dir)
    #[arg(global = true, long)]
    pub config_dir: Option<PathBuf>,

    /// Directory for odk-sync.log (defaults to <config-dir>/logs)
    #[arg(global = true, long)]
    pub log_dir: Option<PathBuf>,

    /// Print results and errors as JSON
    #[arg(global = true, long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(global = true, short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the engine status for an application
    Status { app_name: String },

    /// Start a sync session
    Sync {
        app_name: String,

        /// Attachment policy (sync, upload, download, none)
        #[arg(short, long, default_value = "sync")]
        attachments: SyncAttachmentState,

        /// Wait for the session to finish and print its result
        #[arg(short, long)]
        wait: bool,

        /// Status polling interval while waiting, in milliseconds
        #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
        poll_ms: u64,
    },

    /// Reset the server copy of an application from local data
    Reset {
        app_name: String,

        /// Attachment policy (sync, upload, download, none)
        #[arg(short, long, default_value = "sync")]
        attachments: SyncAttachmentState,
    },

    /// Show sync progress
    Progress { app_name: String },

    /// Show the engine's latest update message
    Message { app_name: String },

    /// Show the result of the latest sync session
    Result { app_name: String },

    /// Inspect or create the config file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective config
    Show,

    /// Write the default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

impl Command {
    /// Whether the command talks to the sync engine.
    pub fn needs_engine(&self) -> bool {
        !matches!(self, Command::Config(_))
    }
}
