//! Command handlers for the AYUR-SYNC CLI

use std::io::{self, BufRead, Write};

use tokio::sync::mpsc;
use tracing::{info, warn};

use ayursync_core::{
    ApiError, ConfirmError, DashboardStats, DeepResetController, Destination, GateError,
    MonitorEvent, SessionOutcome, CONFIRMATION_PHRASE,
};

use crate::app::AdminApp;
use crate::cli::Commands;
use crate::config::AdminConfig;
use crate::error::{CliError, Result};
use crate::terminal_interface::{outcome_message, ConsoleReporter};
#[cfg(feature = "tui")]
use crate::tui::TuiManager;

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(command: Commands, app: AdminApp) -> Result<()> {
        match command {
            Commands::Login { username, password } => {
                Self::handle_login_command(&app, username, password).await
            }
            Commands::Logout => Self::handle_logout_command(&app),
            Commands::Stats => Self::handle_stats_command(&app).await,
            Commands::ResetCuration { yes } => Self::handle_reset_curation_command(&app, yes).await,
            Commands::DeepReset { confirm } => Self::handle_deep_reset_command(&app, confirm).await,
            Commands::Watch => Self::handle_watch_command(&app).await,
            #[cfg(feature = "tui")]
            Commands::Tui => Self::handle_tui_command(app).await,
            Commands::Config => {
                println!("{}", AdminConfig::example_config());
                Ok(())
            }
        }
    }

    async fn handle_login_command(
        app: &AdminApp,
        username: String,
        password: Option<String>,
    ) -> Result<()> {
        let password = match password {
            Some(password) => password,
            None => rpassword::prompt_password("Password: ")?,
        };
        app.login(&username, &password).await?;
        println!("Logged in as {}.", username);
        Ok(())
    }

    fn handle_logout_command(app: &AdminApp) -> Result<()> {
        app.logout();
        println!("Logged out.");
        Ok(())
    }

    async fn handle_stats_command(app: &AdminApp) -> Result<()> {
        app.require_login()?;
        let stats = app.dashboard().await?;
        print!("{}", format_dashboard(&stats));
        Ok(())
    }

    async fn handle_reset_curation_command(app: &AdminApp, yes: bool) -> Result<()> {
        app.require_login()?;
        if !yes
            && !confirm_yes_no(
                "Are you sure you want to reset all curation data? This cannot be undone. [y/N] ",
            )?
        {
            return Err(CliError::Aborted("curation reset cancelled".to_string()));
        }

        let message = app.reset_curation().await?;
        println!("{}", message);
        Ok(())
    }

    /// Confirm, start and follow a deep reset
    async fn handle_deep_reset_command(app: &AdminApp, confirm: Option<String>) -> Result<()> {
        if confirm.is_none() {
            println!("This will wipe and regenerate ALL terminology data.");
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Self::start_deep_reset(app, confirm, &mut PromptAnswers, &tx).await?;
        println!("Deep reset started.");
        Self::follow(app, controller, tx, rx).await
    }

    /// Pass the confirmation gate and issue the start request
    ///
    /// With `confirm` given the phrase is checked once and any failure is
    /// final. Otherwise a wrong phrase is asked for again and a failed start
    /// may be retried with the phrase the gate kept.
    async fn start_deep_reset(
        app: &AdminApp,
        confirm: Option<String>,
        answers: &mut (dyn Answers + Send),
        events: &mpsc::UnboundedSender<MonitorEvent>,
    ) -> Result<DeepResetController> {
        app.require_login()?;

        let interactive = confirm.is_none();
        let mut controller = app.controller();
        controller.open_gate()?;

        let mut phrase = Some(match confirm {
            Some(phrase) => phrase,
            None => answers.phrase()?,
        });

        loop {
            if let (Some(gate), Some(input)) = (controller.gate_mut(), phrase.take()) {
                gate.set_input(input);
            }

            match controller.confirm(events.clone()).await {
                Ok(()) => break,
                Err(ConfirmError::Gate(GateError::PhraseMismatch)) if interactive => {
                    println!("{}", GateError::PhraseMismatch);
                    phrase = Some(answers.phrase()?);
                }
                Err(ConfirmError::Start(e)) if interactive && !e.is_auth_failure() => {
                    println!("Failed to start deep reset: {}", e);
                    if !answers.retry()? {
                        controller.cancel_gate();
                        return Err(CliError::Aborted("deep reset not started".to_string()));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!("Deep reset accepted");
        Ok(controller)
    }

    /// Follow an operation that is already running server-side
    async fn handle_watch_command(app: &AdminApp) -> Result<()> {
        app.require_login()?;
        let mut controller = app.controller();
        let (tx, rx) = mpsc::unbounded_channel();
        controller.attach(tx.clone());
        Self::follow(app, controller, tx, rx).await
    }

    /// Print session events until the session ends or the user interrupts
    async fn follow(
        app: &AdminApp,
        mut controller: DeepResetController,
        tx: mpsc::UnboundedSender<MonitorEvent>,
        mut rx: mpsc::UnboundedReceiver<MonitorEvent>,
    ) -> Result<()> {
        // Only the session's clone keeps the channel open from here on
        drop(tx);
        let mut reporter = ConsoleReporter::stdout(app.config().cli.colored_output);

        loop {
            let event = tokio::select! {
                event = rx.recv() => event,
                _ = tokio::signal::ctrl_c() => {
                    controller.teardown();
                    println!("{}", outcome_message(&SessionOutcome::Cancelled));
                    return Err(CliError::Aborted("interrupted".to_string()));
                }
            };

            let Some(event) = event else {
                let outcome = match controller.take_session() {
                    Some(session) => session.join().await,
                    None => SessionOutcome::Cancelled,
                };
                return Self::finish(outcome);
            };

            reporter.report(&event)?;
            controller.observe(&event);

            match event {
                MonitorEvent::Navigate(Destination::NewSuggestions) => {
                    Self::show_new_suggestions(app).await;
                    return Ok(());
                }
                MonitorEvent::Failed { message, .. } => {
                    return Err(CliError::OperationFailed(message));
                }
                MonitorEvent::Abandoned(outcome) => return Self::finish(outcome),
                _ => {}
            }
        }
    }

    fn finish(outcome: SessionOutcome) -> Result<()> {
        match outcome {
            SessionOutcome::Completed => Ok(()),
            SessionOutcome::Failed(message) => Err(CliError::OperationFailed(message)),
            SessionOutcome::LoggedOut => Err(CliError::Api(ApiError::Unauthorized)),
            SessionOutcome::AttemptsExhausted { attempts } => Err(CliError::OperationFailed(
                format!("no terminal state after {} polls", attempts),
            )),
            SessionOutcome::Cancelled => Err(CliError::Aborted("polling cancelled".to_string())),
        }
    }

    /// The "new suggestions" view: how many suggestions now await review
    async fn show_new_suggestions(app: &AdminApp) {
        match app.dashboard().await {
            Ok(stats) => println!("{}", format_new_suggestions(&stats)),
            Err(e) => warn!("Could not load new suggestions: {}", e),
        }
    }

    #[cfg(feature = "tui")]
    async fn handle_tui_command(app: AdminApp) -> Result<()> {
        let mut tui_manager = TuiManager::new(app)?;
        tui_manager.run().await
    }
}

// ----------------------------------------------------------------------------
// Output and Prompts
// ----------------------------------------------------------------------------

pub fn format_dashboard(stats: &DashboardStats) -> String {
    let curation = &stats.curation;
    let completeness = &stats.completeness;
    let rows = [
        ("Curation", None),
        ("  Awaiting review", Some(curation.review)),
        ("  Master map", Some(curation.master_map)),
        ("  Verified", Some(curation.master_map_verified)),
        ("  Rejected", Some(curation.rejected)),
        ("Completeness", None),
        ("  All three systems", Some(completeness.three_systems)),
        ("  Two systems", Some(completeness.two_systems)),
        ("  One system", Some(completeness.one_system)),
    ];

    rows.iter()
        .map(|(label, value)| match value {
            Some(value) => format!("{:<22}{:>8}\n", label, value),
            None => format!("{}\n", label),
        })
        .collect()
}

pub fn format_new_suggestions(stats: &DashboardStats) -> String {
    format!(
        "{} new suggestions are ready for review.",
        stats.curation.review
    )
}

/// Answers the interactive deep reset flow needs from the operator
trait Answers {
    fn phrase(&mut self) -> Result<String>;
    fn retry(&mut self) -> Result<bool>;
}

/// Reads answers from the terminal
struct PromptAnswers;

impl Answers for PromptAnswers {
    fn phrase(&mut self) -> Result<String> {
        prompt(&format!("Type {} to continue: ", CONFIRMATION_PHRASE))
    }

    fn retry(&mut self) -> Result<bool> {
        confirm_yes_no("Try again? [y/N] ")
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(CliError::Aborted("no input".to_string()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn confirm_yes_no(message: &str) -> Result<bool> {
    let answer = prompt(message)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
