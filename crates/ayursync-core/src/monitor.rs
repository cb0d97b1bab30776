//! Deep reset polling session
//!
//! A [`PollingSession`] is a single tokio task that fetches the operation
//! status, renders it, and reports the result over an unbounded channel. Polls
//! are strictly sequential: the next one is scheduled only after the previous
//! response (or failure) has been processed.
//!
//! ```text
//!   start ──► Polling ──running/unknown──► Polling (after poll_interval)
//!                │
//!                ├──completed──► Completed ──redirect_delay──► Navigate
//!                └──error──────► Failed
//! ```
//!
//! Transport failures are logged and the loop carries on; only a successful
//! status response can end the session, with two exceptions: an auth failure
//! (the session was logged out) and an optional attempt cap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::AdminApi;
use crate::config::MonitorConfig;
use crate::render::{render_status, StatusView};
use crate::status::OperationState;

// ----------------------------------------------------------------------------
// Events
// ----------------------------------------------------------------------------

/// Views the client may be sent to when a session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Freshly regenerated mapping suggestions
    NewSuggestions,
}

/// Updates emitted by a polling session
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Non-terminal snapshot
    Progress(StatusView),
    /// Terminal success; a [`MonitorEvent::Navigate`] follows after the redirect delay
    Completed(StatusView),
    /// Terminal error reported by the server
    Failed { message: String, view: StatusView },
    Navigate(Destination),
    /// The session stopped without a terminal server state
    Abandoned(SessionOutcome),
}

impl MonitorEvent {
    /// Whether the trigger control should be restored on this event
    pub fn ends_operation(&self) -> bool {
        matches!(
            self,
            MonitorEvent::Completed(_) | MonitorEvent::Failed { .. } | MonitorEvent::Abandoned(_)
        )
    }

    pub fn view(&self) -> Option<&StatusView> {
        match self {
            MonitorEvent::Progress(view) | MonitorEvent::Completed(view) => Some(view),
            MonitorEvent::Failed { view, .. } => Some(view),
            _ => None,
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Failed(String),
    /// A poll was rejected with 401 or no token was available
    LoggedOut,
    AttemptsExhausted { attempts: u32 },
    Cancelled,
}

// ----------------------------------------------------------------------------
// Polling Session
// ----------------------------------------------------------------------------

pub struct PollingSession {
    api: Arc<dyn AdminApi>,
    config: MonitorConfig,
    events: mpsc::UnboundedSender<MonitorEvent>,
    cancelled: Arc<AtomicBool>,
}

impl PollingSession {
    /// Spawn the polling task on the current runtime
    pub fn spawn(
        api: Arc<dyn AdminApi>,
        config: MonitorConfig,
        events: mpsc::UnboundedSender<MonitorEvent>,
    ) -> PollingHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let session = PollingSession {
            api,
            config,
            events,
            cancelled: cancelled.clone(),
        };
        info!("Deep reset polling started");
        PollingHandle {
            task: Some(tokio::spawn(session.run())),
            cancelled,
        }
    }

    async fn run(self) -> SessionOutcome {
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            debug!("Polling deep reset status (attempt {})", attempts);

            match self.api.deep_reset_status().await {
                Ok(status) => {
                    let view = render_status(&status);
                    match status.state {
                        OperationState::Completed => {
                            info!("Deep reset completed");
                            self.emit(MonitorEvent::Completed(view));
                            tokio::time::sleep(self.config.redirect_delay).await;
                            self.emit(MonitorEvent::Navigate(Destination::NewSuggestions));
                            return SessionOutcome::Completed;
                        }
                        OperationState::Error => {
                            let message = status.error_message();
                            warn!("Deep reset failed: {}", message);
                            self.emit(MonitorEvent::Failed {
                                message: message.clone(),
                                view,
                            });
                            return SessionOutcome::Failed(message);
                        }
                        _ => self.emit(MonitorEvent::Progress(view)),
                    }
                }
                Err(e) if e.is_auth_failure() => {
                    warn!("Deep reset polling stopped: {}", e);
                    self.emit(MonitorEvent::Abandoned(SessionOutcome::LoggedOut));
                    return SessionOutcome::LoggedOut;
                }
                Err(e) => {
                    warn!("Deep reset poll failed: {}", e);
                }
            }

            if let Some(max) = self.config.max_poll_attempts {
                if attempts >= max {
                    warn!("Deep reset polling gave up after {} attempts", attempts);
                    let outcome = SessionOutcome::AttemptsExhausted { attempts };
                    self.emit(MonitorEvent::Abandoned(outcome.clone()));
                    return outcome;
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    fn emit(&self, event: MonitorEvent) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        if self.events.send(event).is_err() {
            debug!("Monitor event dropped: receiver closed");
        }
    }
}

// ----------------------------------------------------------------------------
// Polling Handle
// ----------------------------------------------------------------------------

/// Owner's handle to a running session; dropping it cancels the session
#[derive(Debug)]
pub struct PollingHandle {
    task: Option<JoinHandle<SessionOutcome>>,
    cancelled: Arc<AtomicBool>,
}

impl PollingHandle {
    /// Stop scheduling further polls; any in-flight response is ignored
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Wait for the session to end
    pub async fn join(mut self) -> SessionOutcome {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(SessionOutcome::Cancelled),
            None => SessionOutcome::Cancelled,
        }
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel();
        }
    }
}
