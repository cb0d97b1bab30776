//! Line-oriented progress reporting for non-interactive commands
//!
//! The reporter turns [`MonitorEvent`]s into terminal output: a progress bar
//! whenever the percentage moves, and the log lines the terminal has not seen
//! yet. The server sends the whole log on every poll, so the reporter tracks
//! what it already printed and reprints from scratch when the log stops being
//! an extension of it.

use std::io::{self, Write};

use ayursync_core::{Destination, LogLine, MonitorEvent, SessionOutcome, StatusView};

const BAR_WIDTH: usize = 30;

// ----------------------------------------------------------------------------
// Console Reporter
// ----------------------------------------------------------------------------

pub struct ConsoleReporter<W: Write> {
    out: W,
    colored: bool,
    last_percent: Option<u16>,
    printed: Vec<String>,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(colored: bool) -> Self {
        Self::new(io::stdout(), colored)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, colored: bool) -> Self {
        Self {
            out,
            colored,
            last_percent: None,
            printed: Vec::new(),
        }
    }

    /// Print whatever `event` adds to the terminal
    pub fn report(&mut self, event: &MonitorEvent) -> io::Result<()> {
        if let Some(view) = event.view() {
            self.report_view(view)?;
        }

        match event {
            MonitorEvent::Navigate(Destination::NewSuggestions) => {
                writeln!(self.out, "Opening new suggestions...")?;
            }
            MonitorEvent::Abandoned(outcome) => {
                writeln!(self.out, "{}", outcome_message(outcome))?;
            }
            _ => {}
        }

        self.out.flush()
    }

    fn report_view(&mut self, view: &StatusView) -> io::Result<()> {
        let percent = view.gauge_percent();
        if self.last_percent != Some(percent) {
            writeln!(self.out, "{}", progress_bar(percent))?;
            self.last_percent = Some(percent);
        }

        let texts: Vec<String> = view.lines.iter().map(|line| sanitize(&line.text())).collect();
        let fresh = if texts.starts_with(&self.printed) {
            self.printed.len()
        } else {
            0
        };

        for (line, text) in view.lines.iter().zip(&texts).skip(fresh) {
            writeln!(self.out, "{}", self.paint(line, text))?;
        }
        self.printed = texts;
        Ok(())
    }

    fn paint(&self, line: &LogLine, text: &str) -> String {
        if self.colored {
            colorize(line, text)
        } else {
            text.to_string()
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// ----------------------------------------------------------------------------
// Formatting Helpers
// ----------------------------------------------------------------------------

/// `[#########.....................]  30%`
pub fn progress_bar(percent: u16) -> String {
    let percent = percent.min(100);
    let filled = (usize::from(percent) * BAR_WIDTH + 50) / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        percent
    )
}

/// Drop control characters so server text cannot move the cursor or clear the screen
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

pub fn outcome_message(outcome: &SessionOutcome) -> String {
    match outcome {
        SessionOutcome::Completed => "Deep reset completed.".to_string(),
        SessionOutcome::Failed(message) => format!("Deep reset failed: {}", sanitize(message)),
        SessionOutcome::LoggedOut => "401 Unauthorized. Logging out.".to_string(),
        SessionOutcome::AttemptsExhausted { attempts } => {
            format!("Stopped watching after {} polls; the reset may still be running.", attempts)
        }
        SessionOutcome::Cancelled => "Stopped watching the deep reset.".to_string(),
    }
}

#[cfg(feature = "tui")]
fn colorize(line: &LogLine, text: &str) -> String {
    use crossterm::style::Stylize;

    match line {
        LogLine::Step(_) => text.to_string(),
        LogLine::Done => text.green().bold().to_string(),
        LogLine::Error(_) => text.red().bold().to_string(),
    }
}

#[cfg(not(feature = "tui"))]
fn colorize(_line: &LogLine, text: &str) -> String {
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ayursync_core::{render_status, OperationStatus, StepEntry};

    fn output(reporter: ConsoleReporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    fn progress(progress: f64, steps: &[&str]) -> MonitorEvent {
        let steps = steps
            .iter()
            .map(|msg| StepEntry::new("2025-09-01T10:00:00", *msg))
            .collect();
        MonitorEvent::Progress(render_status(
            &OperationStatus::running(progress).with_steps(steps),
        ))
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0), format!("[{}]   0%", ".".repeat(30)));
        assert_eq!(progress_bar(100), format!("[{}] 100%", "#".repeat(30)));
        assert!(progress_bar(60).starts_with(&format!("[{}.", "#".repeat(18))));
        assert!(progress_bar(250).ends_with("100%"));
    }

    #[test]
    fn test_only_new_lines_are_printed() {
        let mut reporter = ConsoleReporter::new(Vec::new(), false);
        reporter.report(&progress(0.2, &["Truncating"])).unwrap();
        reporter.report(&progress(0.2, &["Truncating", "Loading"])).unwrap();

        let out = output(reporter);
        assert_eq!(out.matches("10:00:00 - Truncating").count(), 1);
        assert_eq!(out.matches("10:00:00 - Loading").count(), 1);
        assert_eq!(out.matches("20%").count(), 1);
    }

    #[test]
    fn test_rewritten_log_is_reprinted() {
        let mut reporter = ConsoleReporter::new(Vec::new(), false);
        reporter.report(&progress(0.2, &["Truncating"])).unwrap();
        reporter.report(&progress(0.4, &["Restarted"])).unwrap();

        let out = output(reporter);
        assert!(out.contains("10:00:00 - Restarted"));
        assert!(out.contains(" 40%"));
    }

    #[test]
    fn test_terminal_events() {
        let mut reporter = ConsoleReporter::new(Vec::new(), false);
        let failed = OperationStatus::failed("disk full");
        reporter
            .report(&MonitorEvent::Failed {
                message: "disk full".into(),
                view: render_status(&failed),
            })
            .unwrap();
        reporter
            .report(&MonitorEvent::Abandoned(SessionOutcome::LoggedOut))
            .unwrap();

        let out = output(reporter);
        assert!(out.contains("ERROR: disk full"));
        assert!(out.contains("Logging out."));
    }

    #[test]
    fn test_completion_and_navigation() {
        let mut reporter = ConsoleReporter::new(Vec::new(), false);
        reporter
            .report(&MonitorEvent::Completed(render_status(&OperationStatus::completed())))
            .unwrap();
        reporter
            .report(&MonitorEvent::Navigate(Destination::NewSuggestions))
            .unwrap();

        let out = output(reporter);
        assert!(out.contains("100%"));
        assert!(out.contains("DONE ✅"));
        assert!(out.ends_with("Opening new suggestions...\n"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize("ok\x1b[2J\r\nnext"), "ok[2Jnext");
        assert_eq!(sanitize("&lt;b&gt;"), "&lt;b&gt;");
    }
}
