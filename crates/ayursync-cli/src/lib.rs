//! AYUR-SYNC CLI library
//!
//! Command-line and terminal UI front-ends for the AYUR-SYNC admin API,
//! including the guarded deep reset flow and its progress monitor.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod terminal_interface;
#[cfg(feature = "tui")]
pub mod tui;

#[cfg(test)]
mod test_utils;

pub use app::AdminApp;
pub use cli::{Cli, Commands};
pub use config::{AdminConfig, ConfigOverrides};
pub use error::{CliError, Result};
