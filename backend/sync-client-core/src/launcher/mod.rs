//! Starting a local sync engine process.
//!
//! The engine is launched as `<executable> serve --port 0 --hostname <host> --token <token>`
//! and announces its endpoint on stdout as `ws://<host>:<port>`. The launcher reads
//! the first lines of output until the announcement shows up.

use crate::ENGINE_BASE_URL;
use crate::error::LaunchError;

use common::ErrorLocation;

use std::env::current_exe;
use std::io::Error as IoError;
use std::io::ErrorKind;
use std::panic::Location;
use std::process::Stdio;
use std::sync::OnceLock;

use log::{debug, info, trace, warn};
use regex::Regex;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::process::Child as TokioChild;
use tokio::process::Command as TokioCommand;
use tokio::spawn as TokioSpawn;

const SERVE_COMMAND: &str = "serve";
const PORT_FLAG: &str = "--port";
const HOSTNAME_FLAG: &str = "--hostname";
const TOKEN_FLAG: &str = "--token";
const AUTO_SELECT_PORT: &str = "0";
const LAUNCH_MAX_OUTPUT_LINES: usize = 100;
const ENGINE_URL_PATTERN: &str = r"ws://(?P<host>[^\s:/]+):(?P<port>\d+)";
const URL_CAPTURE_HOST: &str = "host";
const URL_CAPTURE_PORT: &str = "port";

static URL_REGEX: OnceLock<Regex> = OnceLock::new();

/// A launched engine and the endpoint it announced.
#[derive(Debug)]
pub struct LaunchedEngine {
    pub child: TokioChild,
    pub url: String,
    pub port: u16,
}

pub(crate) fn engine_url_regex() -> Result<&'static Regex, LaunchError> {
    if let Some(re) = URL_REGEX.get() {
        return Ok(re);
    }

    let re = Regex::new(ENGINE_URL_PATTERN).map_err(|e| LaunchError::Validation {
        message: format!("Invalid engine URL pattern: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok(URL_REGEX.get_or_init(|| re))
}

/// Extract `(host, port)` from a line of engine output.
pub(crate) fn parse_announced_endpoint(
    re: &Regex,
    line: &str,
) -> Result<Option<(String, u16)>, LaunchError> {
    let Some(cap) = re.captures(line) else {
        return Ok(None);
    };

    let host = cap
        .name(URL_CAPTURE_HOST)
        .ok_or_else(|| LaunchError::Announce {
            message: format!("Regex matched but missing '{URL_CAPTURE_HOST}' capture group"),
            location: ErrorLocation::from(Location::caller()),
        })?
        .as_str();

    let port_str = cap
        .name(URL_CAPTURE_PORT)
        .ok_or_else(|| LaunchError::Announce {
            message: format!("Regex matched but missing '{URL_CAPTURE_PORT}' capture group"),
            location: ErrorLocation::from(Location::caller()),
        })?
        .as_str();

    match port_str.parse::<u16>() {
        Ok(port) => Ok(Some((host.to_string(), port))),
        Err(e) => {
            warn!("Failed to parse announced port '{port_str}': {e}");
            Ok(None)
        }
    }
}

pub(crate) fn build_launch_command(executable: &str, host: &str, token: &str) -> TokioCommand {
    let mut cmd = TokioCommand::new(executable);
    cmd.arg(SERVE_COMMAND)
        .arg(PORT_FLAG)
        .arg(AUTO_SELECT_PORT)
        .arg(HOSTNAME_FLAG)
        .arg(host)
        .arg(TOKEN_FLAG)
        .arg(token)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// Launch the engine and wait for it to announce its endpoint.
///
/// Looks the executable up on `PATH` first, then next to the current executable.
///
/// # Errors
///
/// * [`LaunchError::Spawn`] - the process could not be started
/// * [`LaunchError::Announce`] - no endpoint appeared in the output
pub async fn launch_engine(
    executable: &str,
    host: &str,
    token: &str,
) -> Result<LaunchedEngine, LaunchError> {
    info!("Launching sync engine {executable} on {host}");

    let child = spawn_engine_process(executable, host, token)?;
    let (child, url, port) = read_announced_url(child, host).await?;

    info!("Sync engine announced {url} (PID: {:?})", child.id());

    Ok(LaunchedEngine { child, url, port })
}

fn spawn_engine_process(
    executable: &str,
    host: &str,
    token: &str,
) -> Result<TokioChild, LaunchError> {
    debug!("Attempting to launch {executable} from PATH");

    match build_launch_command(executable, host, token).spawn() {
        Ok(child) => {
            info!("Launched {executable} from PATH (PID: {:?})", child.id());
            Ok(child)
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("{executable} not in PATH, trying local binary");
            spawn_local_binary(executable, host, token)
        }
        Err(err) => Err(LaunchError::Spawn {
            message: format!("Failed to launch {executable}: {err}"),
            location: ErrorLocation::from(Location::caller()),
            source: Box::new(err),
        }),
    }
}

fn spawn_local_binary(executable: &str, host: &str, token: &str) -> Result<TokioChild, LaunchError> {
    let exe = current_exe().map_err(|e| LaunchError::Spawn {
        message: format!("Failed to get current executable path: {e}"),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(e),
    })?;

    let dir = exe.parent().ok_or_else(|| LaunchError::Spawn {
        message: format!("Executable has no parent directory: {}", exe.display()),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(IoError::new(ErrorKind::NotFound, "no parent dir")),
    })?;

    let local_path = dir.join(executable);
    debug!("Attempting to launch from {}", local_path.display());

    build_launch_command(&local_path.to_string_lossy(), host, token)
        .current_dir(dir)
        .spawn()
        .map_err(|e| LaunchError::Spawn {
            message: format!("Failed to launch {}: {e}", local_path.display()),
            location: ErrorLocation::from(Location::caller()),
            source: Box::new(e),
        })
}

async fn read_announced_url(
    mut child: TokioChild,
    expected_host: &str,
) -> Result<(TokioChild, String, u16), LaunchError> {
    let stdout = child.stdout.take().ok_or_else(|| LaunchError::Announce {
        message: "Engine process has no stdout".to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;

    if let Some(stderr) = child.stderr.take() {
        TokioSpawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                trace!("Engine stderr: {line}");
            }
        });
    }

    let mut lines = BufReader::new(stdout).lines();
    let re = engine_url_regex()?;

    for _ in 0..LAUNCH_MAX_OUTPUT_LINES {
        match lines.next_line().await {
            Ok(Some(line)) => {
                trace!("Engine output: {line}");

                if let Some((host, port)) = parse_announced_endpoint(re, &line)? {
                    if host != expected_host {
                        warn!("Engine announced unexpected host: {host}, expected {expected_host}");
                    }

                    let url = if expected_host == crate::ENGINE_HOSTNAME {
                        format!("{ENGINE_BASE_URL}:{port}")
                    } else {
                        format!("ws://{expected_host}:{port}")
                    };

                    // Drain the rest of stdout.
                    TokioSpawn(async move {
                        while let Ok(Some(line)) = lines.next_line().await {
                            trace!("Engine output: {line}");
                        }
                    });

                    return Ok((child, url, port));
                }
            }
            Ok(None) => {
                debug!("Engine process ended before announcing its URL");
                break;
            }
            Err(e) => {
                return Err(LaunchError::Announce {
                    message: format!("Failed to read engine output: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }
    }

    let _ = child.kill().await;

    Err(LaunchError::Announce {
        message: format!("No engine URL found in first {LAUNCH_MAX_OUTPUT_LINES} lines of output"),
        location: ErrorLocation::from(Location::caller()),
    })
}
