//! TUI Application State

use std::collections::VecDeque;
use std::time::Instant;

use crossterm::event::{self, KeyCode, KeyModifiers};
use ratatui::widgets::ListState;
use tokio::sync::mpsc;
use tracing::info;

use ayursync_core::{
    ConfirmError, DashboardStats, DeepResetController, Destination, GateError, MonitorEvent,
    SessionOutcome, StatusView,
};

use crate::error::CliError;
use crate::terminal_interface::{outcome_message, sanitize};

use super::types::{
    LogEntry, LogLevel, Notification, Tab, TaskResult, TuiAction, MAX_LOG_ENTRIES,
};

// ----------------------------------------------------------------------------
// TUI Application State
// ----------------------------------------------------------------------------

pub struct TuiApp {
    /// Current active tab
    pub(crate) active_tab: Tab,
    /// Trigger, confirmation gate and polling session
    pub(crate) controller: DeepResetController,
    /// Latest rendered snapshot; `None` until an operation is observed
    pub(crate) status_view: Option<StatusView>,
    /// Whether the progress panel is visible
    pub(crate) show_progress: bool,
    pub(crate) progress_list_state: ListState,
    /// Latest dashboard counters
    pub(crate) dashboard: Option<DashboardStats>,
    /// Log entries
    pub(crate) logs: VecDeque<LogEntry>,
    pub(crate) logs_list_state: ListState,
    /// Blocking alert
    pub(crate) notification: Option<Notification>,
    /// Show help overlay
    pub(crate) show_help: bool,
    /// Whether the application should quit
    should_quit: bool,
}

impl TuiApp {
    pub fn new(controller: DeepResetController) -> Self {
        Self {
            active_tab: Tab::Reset,
            controller,
            status_view: None,
            show_progress: false,
            progress_list_state: ListState::default(),
            dashboard: None,
            logs: VecDeque::new(),
            logs_list_state: ListState::default(),
            notification: None,
            show_help: false,
            should_quit: false,
        }
    }

    // ------------------------------------------------------------------------
    // Monitor and API results
    // ------------------------------------------------------------------------

    /// Apply a polling session event; may ask the manager for follow-up work
    pub fn handle_monitor_event(&mut self, event: MonitorEvent) -> Option<TuiAction> {
        self.controller.observe(&event);

        if let Some(view) = event.view() {
            self.show_status(view.clone());
        }

        match event {
            MonitorEvent::Progress(_) => None,
            MonitorEvent::Completed(_) => {
                self.add_log(LogLevel::Info, "Deep reset completed".to_string());
                None
            }
            MonitorEvent::Failed { message, .. } => {
                let message = sanitize(&message);
                self.add_log(LogLevel::Error, format!("Deep reset failed: {}", message));
                self.notification = Some(Notification::error("Deep reset failed", message));
                None
            }
            MonitorEvent::Navigate(Destination::NewSuggestions) => {
                self.add_log(LogLevel::Info, "Opening new suggestions".to_string());
                self.active_tab = Tab::Dashboard;
                Some(TuiAction::RefreshDashboard)
            }
            MonitorEvent::Abandoned(outcome) => {
                self.handle_outcome(&outcome);
                None
            }
        }
    }

    fn handle_outcome(&mut self, outcome: &SessionOutcome) {
        let message = outcome_message(outcome);
        match outcome {
            SessionOutcome::LoggedOut => self.logged_out(),
            SessionOutcome::AttemptsExhausted { .. } => {
                self.add_log(LogLevel::Warn, message.clone());
                self.notification = Some(Notification::warn("Stopped watching", message));
            }
            _ => self.add_log(LogLevel::Info, message),
        }
    }

    fn show_status(&mut self, view: StatusView) {
        self.progress_list_state.select(view.scroll_to());
        self.status_view = Some(view);
        self.show_progress = true;
    }

    /// Apply the result of a spawned request; a started reset reports on `events`
    pub fn handle_task_result(
        &mut self,
        result: TaskResult,
        events: mpsc::UnboundedSender<MonitorEvent>,
    ) {
        match result {
            TaskResult::DeepResetStarted(result) => {
                match self.controller.finish_start(result, events) {
                    Ok(()) => {
                        self.add_log(LogLevel::Info, "Deep reset started".to_string());
                        self.show_progress = true;
                    }
                    Err(e) => self.start_failed(&e),
                }
            }
            TaskResult::Dashboard(result) => self.set_dashboard(result),
        }
    }

    /// The start request failed; the gate is back in its enabled state
    pub fn start_failed(&mut self, error: &ConfirmError) {
        if let ConfirmError::Start(e) = error {
            if e.is_auth_failure() {
                self.controller.cancel_gate();
                self.logged_out();
                return;
            }
        }
        let message = sanitize(&error.to_string());
        self.add_log(LogLevel::Error, message.clone());
        self.notification = Some(Notification::error("Deep reset", message));
    }

    pub fn set_dashboard(&mut self, result: Result<DashboardStats, CliError>) {
        match result {
            Ok(stats) => {
                self.add_log(
                    LogLevel::Debug,
                    format!("Dashboard refreshed: {} awaiting review", stats.curation.review),
                );
                self.dashboard = Some(stats);
            }
            Err(CliError::Api(e)) if e.is_auth_failure() => self.logged_out(),
            Err(e) => {
                let message = sanitize(&e.to_string());
                self.add_log(LogLevel::Error, format!("Dashboard refresh failed: {}", message));
                self.notification = Some(Notification::error("Dashboard", message));
            }
        }
    }

    /// The session token is gone; nothing else will work until `ayursync login`
    pub fn logged_out(&mut self) {
        self.add_log(LogLevel::Error, "401 Unauthorized. Logging out.".to_string());
        self.notification = Some(Notification::error(
            "Logged out",
            "Your session has ended. Quit and run `ayursync login` to continue.",
        ));
    }

    /// Add a log entry
    pub(crate) fn add_log(&mut self, level: LogLevel, message: String) {
        info!("{} {}", level.prefix().trim_end(), message);
        self.logs.push_back(LogEntry {
            timestamp: Instant::now(),
            level,
            message,
        });

        // Trim old logs
        while self.logs.len() > MAX_LOG_ENTRIES {
            self.logs.pop_front();
        }

        // Auto-scroll to bottom if we're on the logs tab
        if self.active_tab == Tab::Logs {
            self.logs_list_state
                .select(Some(self.logs.len().saturating_sub(1)));
        }
    }

    // ------------------------------------------------------------------------
    // Keyboard input
    // ------------------------------------------------------------------------

    /// Handle keyboard input
    pub fn handle_key(&mut self, key: event::KeyEvent) -> Option<TuiAction> {
        if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
            self.should_quit = true;
            return None;
        }

        // Modal layers, topmost first
        if self.notification.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.notification = None;
            }
            return None;
        }
        if self.controller.is_gate_open() {
            return self.handle_gate_input(key);
        }

        // Global keybindings
        match (key.code, key.modifiers) {
            (KeyCode::F(1), _) => {
                self.show_help = !self.show_help;
                return None;
            }
            (KeyCode::Tab, KeyModifiers::NONE) => {
                self.active_tab = self.active_tab.next();
                return None;
            }
            (KeyCode::BackTab, _) => {
                self.active_tab = self.active_tab.previous();
                return None;
            }
            (KeyCode::Char('q'), _) => {
                self.should_quit = true;
                return None;
            }
            _ => {}
        }

        // Tab-specific keybindings
        match self.active_tab {
            Tab::Reset => self.handle_reset_input(key),
            Tab::Dashboard => match key.code {
                KeyCode::Char('r') => Some(TuiAction::RefreshDashboard),
                _ => None,
            },
            Tab::Logs => {
                self.scroll_logs(key.code);
                None
            }
        }
    }

    fn handle_reset_input(&mut self, key: event::KeyEvent) -> Option<TuiAction> {
        match key.code {
            KeyCode::Enter | KeyCode::Char('r') => {
                if let Err(e) = self.controller.open_gate() {
                    self.add_log(LogLevel::Warn, e.to_string());
                }
                None
            }
            KeyCode::Char('w') if self.controller.trigger().is_enabled() => {
                Some(TuiAction::WatchDeepReset)
            }
            KeyCode::Char('h') => {
                self.show_progress = !self.show_progress && self.status_view.is_some();
                None
            }
            _ => None,
        }
    }

    /// Keys while the confirmation dialog is open
    fn handle_gate_input(&mut self, key: event::KeyEvent) -> Option<TuiAction> {
        if key.code == KeyCode::Esc {
            self.controller.cancel_gate();
            return None;
        }

        let gate = self.controller.gate_mut()?;
        match key.code {
            KeyCode::Enter => {
                if gate.is_confirm_enabled() {
                    return Some(TuiAction::ConfirmDeepReset);
                }
                if !gate.is_busy() {
                    let hint = GateError::PhraseMismatch.to_string();
                    self.add_log(LogLevel::Debug, hint);
                }
            }
            KeyCode::Char(c) => gate.insert_char(c),
            KeyCode::Backspace => gate.backspace(),
            KeyCode::Delete => gate.delete(),
            KeyCode::Left => gate.move_left(),
            KeyCode::Right => gate.move_right(),
            KeyCode::Home => gate.move_home(),
            KeyCode::End => gate.move_end(),
            _ => {}
        }
        None
    }

    fn scroll_logs(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => {
                if let Some(selected) = self.logs_list_state.selected() {
                    if selected > 0 {
                        self.logs_list_state.select(Some(selected - 1));
                    }
                }
            }
            KeyCode::Down => {
                if let Some(selected) = self.logs_list_state.selected() {
                    if selected < self.logs.len().saturating_sub(1) {
                        self.logs_list_state.select(Some(selected + 1));
                    }
                } else if !self.logs.is_empty() {
                    self.logs_list_state.select(Some(0));
                }
            }
            _ => {}
        }
    }

    /// Check if should quit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    // Getters for private fields
    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn controller(&self) -> &DeepResetController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut DeepResetController {
        &mut self.controller
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }
}
