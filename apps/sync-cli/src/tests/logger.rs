// Unit tests for logger initialization and log file handling

use crate::logger::{
    DEFAULT_LEVEL, LOG_FILE_NAME, VERBOSE_LEVEL, file_level, initialize, open_log_file,
};

use std::path::PathBuf;

use log::LevelFilter;
use serial_test::serial;
use tempfile::tempdir;

/// **VALUE**: Verifies that calling initialize() multiple times doesn't panic or fail.
///
/// **WHY THIS MATTERS**: fern installs a process-wide logger. A second install
/// fails, so a repeated call must be absorbed by the guards instead of surfacing
/// an error to the command that happened to call it.
///
/// **BUG THIS CATCHES**: Would catch if the Once or AtomicBool guards are removed.
#[test]
#[serial]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A fresh log directory that does not exist yet
    let temp_dir = tempdir().unwrap();
    let log_dir = temp_dir.path().join("logs");

    // WHEN: Calling initialize twice
    let result1 = initialize(&log_dir, DEFAULT_LEVEL);
    let result2 = initialize(&log_dir, VERBOSE_LEVEL);

    // THEN: Both return Ok and the log file exists
    assert!(result1.is_ok(), "First initialization should succeed");
    assert!(
        result2.is_ok(),
        "Second initialization should succeed (idempotent)"
    );
    assert!(log_dir.join(LOG_FILE_NAME).exists());
}

/// **VALUE**: Verifies that an unusable log directory is reported, not panicked on.
///
/// **BUG THIS CATCHES**: Would catch if `fern::log_file()` or the directory
/// creation were unwrapped.
#[test]
fn given_invalid_log_dir_when_log_file_opened_then_returns_cli_error() {
    // GIVEN: A path below a device file, which can never be a directory
    let invalid_dir = PathBuf::from("/dev/null/invalid-path");

    // WHEN: Opening the log file
    let result = open_log_file(&invalid_dir);

    // THEN: A Cli error is returned
    let err = result.unwrap_err();
    let err_string = format!("{err:?}");
    assert!(err_string.contains("Cli"), "Expected CliError::Cli, got {err_string}");
}

/// **VALUE**: The log file keeps at least Info records even when the console is quiet.
///
/// **BUG THIS CATCHES**: Would catch the file dispatch inheriting the Warn
/// console level and losing connection and progress records.
#[test]
fn given_console_level_when_file_level_computed_then_never_coarser_than_info() {
    assert_eq!(file_level(DEFAULT_LEVEL), LevelFilter::Info);
    assert_eq!(file_level(VERBOSE_LEVEL), LevelFilter::Debug);
    assert_eq!(file_level(LevelFilter::Trace), LevelFilter::Trace);
}
