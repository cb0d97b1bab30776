//! Terminal User Interface using ratatui
//!
//! Tabs for the deep reset trigger, the curation dashboard and an activity
//! log, with a progress panel that follows a running deep reset.
//!
//! ## Architecture
//!
//! - [`types`] - Type definitions and constants
//! - [`app`] - TUI application state and key handling
//! - [`manager`] - Terminal manager and event loop
//! - [`render`] - Rendering helper functions
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ayursync_cli::app::AdminApp;
//! use ayursync_cli::config::AdminConfig;
//! use ayursync_cli::tui::TuiManager;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = AdminApp::new(AdminConfig::load()?)?;
//! let mut tui = TuiManager::new(app)?;
//! tui.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod manager;
pub mod render;
pub mod types;

// Re-export main types
pub use app::TuiApp;
pub use manager::TuiManager;
