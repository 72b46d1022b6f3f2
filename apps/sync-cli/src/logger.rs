//! Logging for the `odk-sync` command line.
//!
//! Colored output goes to stderr so stdout carries only command results.
//! Every record is also appended to `odk-sync.log` in the log directory.

use crate::error::CliError;

use common::ErrorLocation;

use std::fs::{File, create_dir_all};
use std::io::stderr;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, debug, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

/// Log file name.
pub const LOG_FILE_NAME: &str = "odk-sync.log";

const LOGGER_INITIALIZED_MESSAGE_PREFIX: &str = "Logger initialized with level: ";

const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str = "Logger already initialized";

/// Default console level.
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Warn;

/// Level used with `--verbose`.
pub const VERBOSE_LEVEL: LevelFilter = LevelFilter::Debug;

/// Initialize the logger with stderr and file output.
///
/// Safe to call more than once; later calls log a warning and return Ok.
/// The file always records at `Info` or finer, whatever the console level.
///
/// # Errors
///
/// Returns [`CliError::Cli`] if the log directory or file cannot be created
/// or another logger is already installed.
pub fn initialize(log_dir: &Path, console_level: LevelFilter) -> Result<(), CliError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = initialize_internal(log_dir, console_level);
        if result.is_ok() {
            debug!("{LOGGER_INITIALIZED_MESSAGE_PREFIX}{console_level:?}");
        }
    });

    result
}

/// Level the file dispatch records at.
pub fn file_level(console_level: LevelFilter) -> LevelFilter {
    console_level.max(LevelFilter::Info)
}

/// Create `log_dir` if needed and open the log file for appending.
#[track_caller]
pub(crate) fn open_log_file(log_dir: &Path) -> Result<File, CliError> {
    create_dir_all(log_dir).map_err(|e| CliError::Cli {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    fern::log_file(log_dir.join(LOG_FILE_NAME)).map_err(|e| CliError::Cli {
        message: format!("Failed to create log file: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}

#[track_caller]
fn initialize_internal(log_dir: &Path, console_level: LevelFilter) -> Result<(), CliError> {
    let color_configuration = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let file_level = file_level(console_level);
    let base_dispatch = Dispatch::new().level(file_level);

    let stderr_dispatch = Dispatch::new()
        .level(console_level)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message}",
                date = format_rfc3339(SystemTime::now()),
                level = color_configuration.color(record.level()),
                message = message,
            ))
        })
        .chain(stderr());

    let file_dispatch = Dispatch::new()
        .level(file_level)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level} {target}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                target = record.target(),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0)
            ))
        })
        .chain(open_log_file(log_dir)?);

    base_dispatch
        .chain(stderr_dispatch)
        .chain(file_dispatch)
        .apply()
        .map_err(|e| CliError::Cli {
            message: format!("Failed to initialize logger: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    Ok(())
}
