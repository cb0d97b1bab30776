//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Backend API base URL, including the /api prefix
    #[arg(long)]
    pub api_url: Option<String>,

    /// File holding the session token between invocations
    #[arg(long)]
    pub token_file: Option<String>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Log in and store a session token
    Login {
        #[arg(short, long)]
        username: String,
        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Show dashboard counters
    Stats,
    /// Delete curated data and regenerate suggestions
    ResetCuration {
        /// Skip the yes/no confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Wipe and regenerate all terminology data, then follow its progress
    DeepReset {
        /// Confirmation phrase; prompted for when omitted
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Follow a deep reset that is already running
    Watch,
    /// Start the interactive terminal UI
    #[cfg(feature = "tui")]
    Tui,
    /// Print an example configuration file
    Config,
}
