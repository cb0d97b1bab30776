//! Type definitions for the TUI

use std::time::{Duration, Instant};

use ratatui::prelude::Stylize;
use ratatui::style::{Color, Style};

use ayursync_core::{DashboardStats, LogLine, StartAck};

use crate::error::CliError;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Maximum number of log entries to keep
pub const MAX_LOG_ENTRIES: usize = 500;
/// UI refresh rate
pub const TICK_RATE: Duration = Duration::from_millis(50);

// ----------------------------------------------------------------------------
// Tab Navigation
// ----------------------------------------------------------------------------

/// Available tabs in the TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Reset,
    Dashboard,
    Logs,
}

impl Tab {
    pub const ALL: &'static [Tab] = &[Tab::Reset, Tab::Dashboard, Tab::Logs];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Reset => "Deep Reset",
            Tab::Dashboard => "Dashboard",
            Tab::Logs => "Logs",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|&t| t == *self).unwrap_or(0)
    }

    pub fn next(&self) -> Tab {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(&self) -> Tab {
        let current_index = self.index();
        if current_index == 0 {
            Self::ALL[Self::ALL.len() - 1]
        } else {
            Self::ALL[current_index - 1]
        }
    }
}

// ----------------------------------------------------------------------------
// Actions
// ----------------------------------------------------------------------------

/// Work the manager performs on behalf of a key press or monitor event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuiAction {
    /// The gate is open with the phrase typed; issue the start request
    ConfirmDeepReset,
    /// Attach a monitor to an operation already running server-side
    WatchDeepReset,
    RefreshDashboard,
}

/// Outcome of a request the manager ran on a spawned task
#[derive(Debug)]
pub enum TaskResult {
    DeepResetStarted(ayursync_core::Result<StartAck>),
    Dashboard(Result<DashboardStats, CliError>),
}

// ----------------------------------------------------------------------------
// Notifications
// ----------------------------------------------------------------------------

/// Blocking alert shown over everything else until dismissed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub level: LogLevel,
}

impl Notification {
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: LogLevel::Error,
        }
    }

    pub fn warn(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: LogLevel::Warn,
        }
    }
}

// ----------------------------------------------------------------------------
// Logging Types
// ----------------------------------------------------------------------------

/// A log entry for the logs tab
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: Instant,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn style(&self) -> Style {
        match self {
            LogLevel::Error => Style::default().fg(Color::Red).bold(),
            LogLevel::Warn => Style::default().fg(Color::Yellow),
            LogLevel::Info => Style::default().fg(Color::Green),
            LogLevel::Debug => Style::default().fg(Color::Gray),
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN ",
            LogLevel::Info => "INFO ",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Style for one line of the progress log
pub fn log_line_style(line: &LogLine) -> Style {
    match line {
        LogLine::Step(_) => Style::default(),
        LogLine::Done => Style::default().fg(Color::Green).bold(),
        LogLine::Error(_) => Style::default().fg(Color::Red).bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_cycle() {
        assert_eq!(Tab::Reset.next(), Tab::Dashboard);
        assert_eq!(Tab::Logs.next(), Tab::Reset);
        assert_eq!(Tab::Reset.previous(), Tab::Logs);
        assert_eq!(Tab::Dashboard.previous(), Tab::Reset);
    }
}
