mod config;
mod error;
mod ipc;
mod launcher;
