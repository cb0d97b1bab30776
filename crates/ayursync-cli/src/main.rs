//! AYUR-SYNC admin CLI entry point

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{debug, error};

use ayursync_cli::{
    app::AdminApp,
    cli::{Cli, Commands},
    commands::CommandDispatcher,
    config::{AdminConfig, ConfigOverrides},
    error::Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = load_configuration(&cli)?;

    // Initialize logging
    setup_logging(&cli.command, &config)?;
    debug!("API base URL: {}", config.api.base_url);

    // Create application
    let app = AdminApp::new(config)?;

    // Execute the command
    if let Err(e) = CommandDispatcher::execute(cli.command, app).await {
        error!("{}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Setup logging based on verbosity level
///
/// The terminal UI owns the screen, so in that mode log lines go to
/// `tui.log` next to the token file instead of stderr.
fn setup_logging(command: &Commands, config: &AdminConfig) -> Result<()> {
    let log_level = if config.cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let builder = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if is_tui(command) {
        let token_path = config.token_path()?;
        let log_dir = token_path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(log_dir)?;
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("tui.log"))?;
        builder
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(log_file))
            .init();
        return Ok(());
    }

    builder.with_writer(std::io::stderr).init();
    Ok(())
}

#[cfg(feature = "tui")]
fn is_tui(command: &Commands) -> bool {
    matches!(command, Commands::Tui)
}

#[cfg(not(feature = "tui"))]
fn is_tui(_command: &Commands) -> bool {
    false
}

/// Load configuration from the standard layers plus command line overrides
fn load_configuration(cli: &Cli) -> Result<AdminConfig> {
    let overrides = ConfigOverrides {
        api_url: cli.api_url.clone(),
        token_file: cli.token_file.as_ref().map(PathBuf::from),
        verbose: cli.verbose.then_some(true),
    };
    let config_file = cli.config.as_deref().map(Path::new);
    Ok(AdminConfig::load_with_overrides(config_file, overrides)?)
}
