//! Projection of a status snapshot onto a progress bar and log
//!
//! [`render_status`] is a pure function of the latest [`OperationStatus`]: the
//! backend returns the cumulative step log on every poll, so the view is
//! rebuilt wholesale rather than appended to.

use std::fmt;

use crate::status::{OperationState, OperationStatus};

/// Text of the terminal success marker
pub const DONE_MARKER: &str = "DONE ✅";

/// Escape text for insertion into markup-rendering views
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Time-of-day portion of an ISO-8601 timestamp (everything after `T`)
pub fn time_of_day(timestamp: &str) -> &str {
    timestamp.split('T').nth(1).unwrap_or("")
}

/// Progress percentage clamped to [0, 100]; missing or NaN renders as 0
pub fn progress_percent(progress: Option<f64>) -> f64 {
    match progress {
        Some(p) if p.is_finite() => (p * 100.0).clamp(0.0, 100.0),
        Some(p) if p == f64::INFINITY => 100.0,
        _ => 0.0,
    }
}

// ----------------------------------------------------------------------------
// Log Lines
// ----------------------------------------------------------------------------

/// One rendered line of the progress log; all text is already escaped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Step(String),
    Done,
    Error(String),
}

impl LogLine {
    pub fn text(&self) -> String {
        match self {
            LogLine::Step(text) => text.clone(),
            LogLine::Done => DONE_MARKER.to_string(),
            LogLine::Error(message) => format!("ERROR: {}", message),
        }
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

// ----------------------------------------------------------------------------
// Status View
// ----------------------------------------------------------------------------

/// Everything a front-end needs to draw the progress panel
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub state: OperationState,
    /// Bar width in percent, already clamped
    pub percent: f64,
    pub lines: Vec<LogLine>,
}

impl StatusView {
    pub fn empty() -> Self {
        Self {
            state: OperationState::NotStarted,
            percent: 0.0,
            lines: Vec::new(),
        }
    }

    /// Rounded width for widgets that take whole percents
    pub fn gauge_percent(&self) -> u16 {
        self.percent.round() as u16
    }

    pub fn width_label(&self) -> String {
        format!("{}%", self.gauge_percent())
    }

    /// Index of the newest line, the auto-scroll target
    pub fn scroll_to(&self) -> Option<usize> {
        self.lines.len().checked_sub(1)
    }
}

impl Default for StatusView {
    fn default() -> Self {
        Self::empty()
    }
}

/// Render a snapshot into a [`StatusView`]
pub fn render_status(status: &OperationStatus) -> StatusView {
    let mut lines: Vec<LogLine> = status
        .steps
        .iter()
        .map(|step| {
            LogLine::Step(format!(
                "{} - {}",
                escape_html(time_of_day(&step.timestamp)),
                escape_html(&step.message)
            ))
        })
        .collect();

    match status.state {
        OperationState::Completed => lines.push(LogLine::Done),
        OperationState::Error => lines.push(LogLine::Error(escape_html(&status.error_message()))),
        _ => {}
    }

    StatusView {
        state: status.state.clone(),
        percent: progress_percent(status.progress),
        lines,
    }
}
