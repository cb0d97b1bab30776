//! TUI Manager - handles terminal and rendering

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crossterm::{
    event::{self, Event, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Tabs, Wrap,
    },
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use ayursync_core::{
    start_deep_reset, AdminApi, ConfirmationGate, MonitorEvent, StatusView, CONFIRMATION_PHRASE,
};

use crate::app::AdminApp;
use crate::error::{CliError, Result};
use crate::terminal_interface::sanitize;

use super::app::TuiApp;
use super::render::{centered_rect, cursor_column, format_elapsed};
use super::types::{log_line_style, LogLevel, Tab, TaskResult, TuiAction, TICK_RATE};

// ----------------------------------------------------------------------------
// TUI Manager
// ----------------------------------------------------------------------------

pub struct TuiManager {
    terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
    tui_app: TuiApp,
    app: AdminApp,
    monitor_tx: mpsc::UnboundedSender<MonitorEvent>,
    monitor_rx: mpsc::UnboundedReceiver<MonitorEvent>,
    task_tx: mpsc::UnboundedSender<TaskResult>,
    task_rx: mpsc::UnboundedReceiver<TaskResult>,
}

impl TuiManager {
    /// Create a new TUI manager
    pub fn new(app: AdminApp) -> Result<Self> {
        // Initialize terminal
        enable_raw_mode().map_err(|e| CliError::UI(format!("Failed to enable raw mode: {}", e)))?;
        let mut stdout = std::io::stdout();
        stdout
            .execute(EnterAlternateScreen)
            .map_err(|e| CliError::UI(format!("Failed to enter alternate screen: {}", e)))?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)
            .map_err(|e| CliError::UI(format!("Failed to create terminal: {}", e)))?;

        let (monitor_tx, monitor_rx) = mpsc::unbounded_channel();
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let tui_app = TuiApp::new(app.controller());

        Ok(Self {
            terminal,
            tui_app,
            app,
            monitor_tx,
            monitor_rx,
            task_tx,
            task_rx,
        })
    }

    /// Run the TUI main loop
    pub async fn run(&mut self) -> Result<()> {
        let mut last_tick = Instant::now();

        info!("Starting TUI main loop");
        if self.app.is_authenticated() {
            self.perform(TuiAction::RefreshDashboard);
        } else {
            self.tui_app.logged_out();
        }

        loop {
            // Handle terminal events
            let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
            if event::poll(timeout)
                .map_err(|e| CliError::UI(format!("Event poll failed: {}", e)))?
            {
                if let Event::Key(key) = event::read()
                    .map_err(|e| CliError::UI(format!("Failed to read event: {}", e)))?
                {
                    if key.kind == KeyEventKind::Press {
                        if let Some(action) = self.tui_app.handle_key(key) {
                            self.perform(action);
                        }
                    }
                }
            }

            // Handle finished requests
            while let Ok(result) = self.task_rx.try_recv() {
                let events = self.monitor_tx.clone();
                self.tui_app.handle_task_result(result, events);
            }

            // Handle polling session events
            while let Ok(event) = self.monitor_rx.try_recv() {
                if let Some(action) = self.tui_app.handle_monitor_event(event) {
                    self.perform(action);
                }
            }

            // Check if should quit
            if self.tui_app.should_quit() {
                break;
            }

            // Render UI
            if last_tick.elapsed() >= TICK_RATE {
                self.draw()?;
                last_tick = Instant::now();
            }

            // Let spawned requests make progress on a single-threaded runtime
            tokio::task::yield_now().await;
        }

        self.tui_app.controller_mut().teardown();
        info!("TUI exited");
        Ok(())
    }

    /// Carry out work requested by the UI state
    ///
    /// Network requests run on spawned tasks and report back over the task
    /// channel, so keys and redraws keep flowing while they are in flight.
    fn perform(&mut self, action: TuiAction) {
        match action {
            TuiAction::ConfirmDeepReset => {
                if let Err(e) = self.tui_app.controller_mut().begin_confirm() {
                    warn!("Confirmation refused: {}", e);
                    return;
                }
                // The gate shows "Starting..." until the result arrives
                spawn_start(self.tui_app.controller().api(), self.task_tx.clone());
            }
            TuiAction::WatchDeepReset => {
                let events = self.monitor_tx.clone();
                self.tui_app.controller_mut().attach(events);
                self.tui_app
                    .add_log(LogLevel::Info, "Watching deep reset progress".to_string());
            }
            TuiAction::RefreshDashboard => {
                spawn_dashboard(self.app.clone(), self.task_tx.clone());
            }
        }
    }

    fn draw(&mut self) -> Result<()> {
        let tui_app = &self.tui_app;
        self.terminal
            .draw(|f| {
                Self::render_ui_static(f, tui_app);
            })
            .map_err(|e| CliError::UI(format!("Failed to draw terminal: {}", e)))?;
        Ok(())
    }

    /// Render the complete UI
    fn render_ui_static(frame: &mut Frame, tui_app: &TuiApp) {
        let progress_view = tui_app
            .status_view
            .as_ref()
            .filter(|_| tui_app.show_progress);

        let main_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),                                             // Header with tabs
                Constraint::Min(0),                                                // Main content
                Constraint::Length(if progress_view.is_some() { 12 } else { 0 }), // Progress panel
                Constraint::Length(1),                                             // Status bar
            ])
            .split(frame.area());

        Self::render_header_static(frame, main_layout[0], tui_app);

        match tui_app.active_tab {
            Tab::Reset => Self::render_reset_tab_static(frame, main_layout[1], tui_app),
            Tab::Dashboard => Self::render_dashboard_tab_static(frame, main_layout[1], tui_app),
            Tab::Logs => Self::render_logs_tab_static(frame, main_layout[1], tui_app),
        }

        if let Some(view) = progress_view {
            Self::render_progress_static(frame, main_layout[2], view, tui_app);
        }

        Self::render_status_bar_static(frame, main_layout[3], tui_app);

        // Overlays, bottom to top
        if tui_app.show_help {
            Self::render_help_overlay_static(frame);
        }
        if let Some(gate) = tui_app.controller.gate() {
            Self::render_gate_overlay_static(frame, gate);
        }
        if let Some(notification) = &tui_app.notification {
            let area = centered_rect(60, 30, frame.area());
            let paragraph = Paragraph::new(vec![
                Line::from(notification.message.as_str()),
                Line::from(""),
                Line::from(Span::styled(
                    "Enter/Esc: Dismiss",
                    Style::default().fg(Color::Gray),
                )),
            ])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(notification.title.as_str())
                    .title_style(notification.level.style()),
            )
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));

            frame.render_widget(Clear, area);
            frame.render_widget(paragraph, area);
        }
    }

    fn render_header_static(frame: &mut Frame, area: Rect, tui_app: &TuiApp) {
        let titles: Vec<&str> = Tab::ALL.iter().map(|t| t.title()).collect();
        let selected = Tab::ALL
            .iter()
            .position(|&t| t == tui_app.active_tab)
            .unwrap_or(0);

        let tabs = Tabs::new(titles)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("AYUR-SYNC Admin")
                    .title_style(Style::default().fg(Color::Cyan).bold()),
            )
            .select(selected)
            .style(Style::default().fg(Color::White))
            .highlight_style(Style::default().fg(Color::Yellow).bold());

        frame.render_widget(tabs, area);
    }

    fn render_reset_tab_static(frame: &mut Frame, area: Rect, tui_app: &TuiApp) {
        let trigger = tui_app.controller.trigger();
        let button_style = if trigger.is_enabled() {
            Style::default().fg(Color::White).bg(Color::Red).bold()
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let text = vec![
            Line::from("Deep reset wipes every mapping, suggestion and curation decision,"),
            Line::from("then regenerates suggestions from the source spreadsheets."),
            Line::from(""),
            Line::from(Span::styled(format!("[ {} ]", trigger.label()), button_style)),
            Line::from(""),
            Line::from(Span::styled(
                if trigger.is_enabled() {
                    "Enter/r: Start deep reset | w: Watch a reset already running | h: Toggle progress"
                } else {
                    "A deep reset is running | h: Toggle progress"
                },
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Overall Reset")
                    .title_style(Style::default().fg(Color::Red)),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });

        frame.render_widget(paragraph, area);
    }

    fn render_dashboard_tab_static(frame: &mut Frame, area: Rect, tui_app: &TuiApp) {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let (curation, completeness) = match &tui_app.dashboard {
            Some(stats) => (
                format!(
                    "Awaiting review: {}\n\
                     Master map: {}\n\
                     Verified: {}\n\
                     Rejected: {}",
                    stats.curation.review,
                    stats.curation.master_map,
                    stats.curation.master_map_verified,
                    stats.curation.rejected,
                ),
                format!(
                    "All three systems: {}\n\
                     Two systems: {}\n\
                     One system: {}",
                    stats.completeness.three_systems,
                    stats.completeness.two_systems,
                    stats.completeness.one_system,
                ),
            ),
            None => ("Loading...".to_string(), "Loading...".to_string()),
        };

        let curation_widget = Paragraph::new(curation)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Curation")
                    .title_style(Style::default().fg(Color::Green)),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(curation_widget, layout[0]);

        let completeness_widget = Paragraph::new(completeness)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Mapping Completeness")
                    .title_style(Style::default().fg(Color::Yellow)),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(completeness_widget, layout[1]);
    }

    /// Render logs tab
    fn render_logs_tab_static(frame: &mut Frame, area: Rect, tui_app: &TuiApp) {
        let logs: Vec<ListItem> = tui_app
            .logs
            .iter()
            .map(|log| {
                let content = format!(
                    "[{}] {} {}",
                    format_elapsed(log.timestamp.elapsed()),
                    log.level.prefix(),
                    log.message
                );
                ListItem::new(Line::from(Span::styled(content, log.level.style())))
            })
            .collect();

        let logs_list = List::new(logs)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Activity")
                    .title_style(Style::default().fg(Color::Magenta)),
            )
            .highlight_style(Style::default().bg(Color::DarkGray));

        let mut logs_list_state = tui_app.logs_list_state.clone();
        frame.render_stateful_widget(logs_list, area, &mut logs_list_state);

        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));

        let mut scrollbar_state = ScrollbarState::default()
            .content_length(tui_app.logs.len())
            .position(tui_app.logs_list_state.selected().unwrap_or(0));

        frame.render_stateful_widget(
            scrollbar,
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }

    /// Bar and cumulative log of the running operation
    fn render_progress_static(frame: &mut Frame, area: Rect, view: &StatusView, tui_app: &TuiApp) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);

        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Deep Reset: {}", view.state)),
            )
            .gauge_style(Style::default().fg(Color::Green))
            .percent(view.gauge_percent().min(100))
            .label(view.width_label());
        frame.render_widget(gauge, layout[0]);

        let lines: Vec<ListItem> = view
            .lines
            .iter()
            .map(|line| {
                ListItem::new(Line::from(Span::styled(
                    sanitize(&line.text()),
                    log_line_style(line),
                )))
            })
            .collect();

        let list = List::new(lines).block(Block::default().borders(Borders::ALL).title("Progress"));
        let mut list_state = tui_app.progress_list_state.clone();
        frame.render_stateful_widget(list, layout[1], &mut list_state);
    }

    /// Confirmation dialog for the deep reset
    fn render_gate_overlay_static(frame: &mut Frame, gate: &ConfirmationGate) {
        let area = centered_rect(60, 40, frame.area());
        let inner = area.inner(Margin {
            vertical: 1,
            horizontal: 2,
        });

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);

        frame.render_widget(Clear, area);
        frame.render_widget(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm Deep Reset")
                .title_style(Style::default().fg(Color::Red).bold())
                .style(Style::default().bg(Color::Black)),
            area,
        );

        let warning = Paragraph::new(format!(
            "This permanently deletes all curated data and regenerates every \
             suggestion. Type {} to enable the button.",
            CONFIRMATION_PHRASE
        ))
        .wrap(Wrap { trim: true });
        frame.render_widget(warning, layout[0]);

        let input = Paragraph::new(gate.input()).block(Block::default().borders(Borders::ALL));
        frame.render_widget(input, layout[1]);
        if !gate.is_busy() {
            let cursor_x = layout[1]
                .x
                .saturating_add(1)
                .saturating_add(cursor_column(gate.input(), gate.cursor()));
            frame.set_cursor_position((cursor_x, layout[1].y + 1));
        }

        let button_style = if gate.is_confirm_enabled() {
            Style::default().fg(Color::White).bg(Color::Red).bold()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let button = Paragraph::new(Span::styled(
            format!("[ {} ]", gate.confirm_label()),
            button_style,
        ))
        .alignment(Alignment::Center);
        frame.render_widget(button, layout[2]);

        let hint = Paragraph::new("Enter: Confirm | Esc: Cancel")
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        frame.render_widget(hint, layout[3]);
    }

    /// Render status bar
    fn render_status_bar_static(frame: &mut Frame, area: Rect, tui_app: &TuiApp) {
        let status_text = match tui_app.active_tab {
            Tab::Reset => "q: Quit | Tab: Switch tabs | F1: Help | Enter: Overall Reset",
            Tab::Dashboard => "q: Quit | Tab: Switch tabs | F1: Help | r: Refresh",
            Tab::Logs => "q: Quit | Tab: Switch tabs | F1: Help | ↑/↓: Navigate",
        };

        let status = Paragraph::new(status_text)
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);

        frame.render_widget(status, area);
    }

    /// Render help overlay
    fn render_help_overlay_static(frame: &mut Frame) {
        let area = centered_rect(80, 70, frame.area());

        let help_text = "AYUR-SYNC Admin Help\n\n\
            Global Shortcuts:\n\
            • F1: Toggle this help\n\
            • Tab / Shift+Tab: Switch between tabs\n\
            • q / Ctrl+C: Quit application\n\n\
            Deep Reset Tab:\n\
            • Enter or r: Open the confirmation dialog\n\
            • w: Follow a deep reset started elsewhere\n\
            • h: Show or hide the progress panel\n\n\
            Confirmation Dialog:\n\
            • Type RESET ALL to enable the button\n\
            • Enter: Start the deep reset\n\
            • Esc: Cancel\n\n\
            Dashboard Tab:\n\
            • r: Refresh counters";

        let help_paragraph = Paragraph::new(help_text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Help")
                    .title_style(Style::default().fg(Color::Cyan).bold()),
            )
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));

        frame.render_widget(Clear, area);
        frame.render_widget(help_paragraph, area);
    }
}

/// Issue the deep reset start request off the UI loop
fn spawn_start(
    api: Arc<dyn AdminApi>,
    results: mpsc::UnboundedSender<TaskResult>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = start_deep_reset(api.as_ref()).await;
        if results.send(TaskResult::DeepResetStarted(result)).is_err() {
            debug!("Start result dropped: TUI closed");
        }
    })
}

/// Load the dashboard counters off the UI loop
fn spawn_dashboard(
    app: AdminApp,
    results: mpsc::UnboundedSender<TaskResult>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = app.dashboard().await;
        if results.send(TaskResult::Dashboard(result)).is_err() {
            debug!("Dashboard result dropped: TUI closed");
        }
    })
}

impl Drop for TuiManager {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = self.terminal.backend_mut().execute(LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use serde_json::json;

    use ayursync_core::api::paths;
    use ayursync_core::Method;

    use crate::test_utils::{scripted_app, ScriptedBackend};

    fn press(app: &mut TuiApp, code: KeyCode, modifiers: KeyModifiers) -> Option<TuiAction> {
        app.handle_key(KeyEvent::new(code, modifiers))
    }

    #[tokio::test]
    async fn test_pending_start_leaves_keys_responsive() {
        let backend = ScriptedBackend::held();
        backend.accept_start();
        backend.report_status(json!({"state": "running", "progress": 0.3}));
        let app = scripted_app(backend.clone());
        let mut tui_app = TuiApp::new(app.controller());
        let (task_tx, mut task_rx) = mpsc::unbounded_channel();
        let (monitor_tx, _monitor_rx) = mpsc::unbounded_channel();

        press(&mut tui_app, KeyCode::Enter, KeyModifiers::NONE);
        for c in "RESET ALL".chars() {
            press(&mut tui_app, KeyCode::Char(c), KeyModifiers::NONE);
        }
        tui_app.controller_mut().begin_confirm().unwrap();
        let request = spawn_start(tui_app.controller().api(), task_tx);

        // Nothing has answered yet, and the UI still takes input
        tokio::task::yield_now().await;
        assert!(task_rx.try_recv().is_err());
        press(&mut tui_app, KeyCode::Esc, KeyModifiers::NONE);
        assert!(tui_app.controller().gate().unwrap().is_busy());

        backend.release();
        let result = task_rx.recv().await.unwrap();
        request.await.unwrap();
        tui_app.handle_task_result(result, monitor_tx);

        assert!(!tui_app.controller().is_gate_open());
        assert!(!tui_app.controller().trigger().is_enabled());
        assert_eq!(backend.count(Method::Post, paths::DEEP_RESET), 1);

        press(&mut tui_app, KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(tui_app.should_quit());
        tui_app.controller_mut().teardown();
    }

    #[tokio::test]
    async fn test_dashboard_refresh_reports_over_channel() {
        let backend = ScriptedBackend::new();
        backend.serve_dashboard(42);
        let app = scripted_app(backend.clone());
        let mut tui_app = TuiApp::new(app.controller());
        let (task_tx, mut task_rx) = mpsc::unbounded_channel();
        let (monitor_tx, _monitor_rx) = mpsc::unbounded_channel();

        spawn_dashboard(app.clone(), task_tx);
        let result = task_rx.recv().await.unwrap();
        tui_app.handle_task_result(result, monitor_tx);

        assert_eq!(tui_app.dashboard.map(|d| d.curation.review), Some(42));
        assert_eq!(backend.count(Method::Get, paths::STATS), 1);
    }
}
