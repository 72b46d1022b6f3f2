//! `odk-sync` command line: argument parsing, command execution, output and logging.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod output;

#[cfg(test)]
mod tests;
