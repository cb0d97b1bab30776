//! Starting a deep reset and owning its trigger control
//!
//! [`DeepResetController`] is the explicit context a view holds for the deep
//! reset feature: the trigger control, the (at most one) open confirmation
//! gate, and the active polling session. Dropping the controller tears the
//! session down with it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::AdminApi;
use crate::config::MonitorConfig;
use crate::errors::{ApiError, GateError, Result};
use crate::gate::ConfirmationGate;
use crate::monitor::{MonitorEvent, PollingHandle, PollingSession};
use crate::status::StartAck;

/// Trigger label while idle
pub const TRIGGER_IDLE_LABEL: &str = "Overall Reset";
/// Trigger label while an operation is in flight
pub const TRIGGER_BUSY_LABEL: &str = "Resetting...";

/// Ask the backend to begin the deep reset, exactly once
///
/// Any body other than `{"status": "accepted"}` counts as failure, even on 2xx.
pub async fn start_deep_reset(api: &dyn AdminApi) -> Result<StartAck> {
    let ack = api.start_deep_reset().await?;
    if !ack.is_accepted() {
        return Err(ApiError::UnexpectedResponse(
            "Unexpected response starting deep reset".to_string(),
        ));
    }
    info!("Deep reset accepted by server");
    Ok(ack)
}

// ----------------------------------------------------------------------------
// Trigger Control
// ----------------------------------------------------------------------------

/// The button that opens the confirmation gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerControl {
    enabled: bool,
    label: &'static str,
}

impl Default for TriggerControl {
    fn default() -> Self {
        Self {
            enabled: true,
            label: TRIGGER_IDLE_LABEL,
        }
    }
}

impl TriggerControl {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.label = TRIGGER_BUSY_LABEL;
    }

    fn restore(&mut self) {
        self.enabled = true;
        self.label = TRIGGER_IDLE_LABEL;
    }
}

// ----------------------------------------------------------------------------
// Controller
// ----------------------------------------------------------------------------

/// Errors from [`DeepResetController::confirm`]
#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error("Failed to start deep reset: {0}")]
    Start(#[from] ApiError),
}

pub struct DeepResetController {
    api: Arc<dyn AdminApi>,
    config: MonitorConfig,
    trigger: TriggerControl,
    gate: Option<ConfirmationGate>,
    session: Option<PollingHandle>,
}

impl DeepResetController {
    pub fn new(api: Arc<dyn AdminApi>, config: MonitorConfig) -> Self {
        Self {
            api,
            config,
            trigger: TriggerControl::default(),
            gate: None,
            session: None,
        }
    }

    pub fn trigger(&self) -> &TriggerControl {
        &self.trigger
    }

    pub fn gate(&self) -> Option<&ConfirmationGate> {
        self.gate.as_ref()
    }

    pub fn gate_mut(&mut self) -> Option<&mut ConfirmationGate> {
        self.gate.as_mut()
    }

    pub fn is_gate_open(&self) -> bool {
        self.gate.is_some()
    }

    /// Whether a polling session is still running
    pub fn is_polling(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_finished())
    }

    /// Open the gate, reusing one that is already open
    pub fn open_gate(&mut self) -> std::result::Result<&mut ConfirmationGate, GateError> {
        if !self.trigger.is_enabled() {
            return Err(GateError::TriggerDisabled);
        }
        Ok(self.gate.get_or_insert_with(ConfirmationGate::new))
    }

    /// Discard the gate and its input; nothing is sent to the backend
    pub fn cancel_gate(&mut self) {
        if let Some(gate) = &self.gate {
            if gate.is_busy() {
                return;
            }
        }
        self.gate = None;
    }

    /// Move the open gate into its busy "starting" sub-state
    pub fn begin_confirm(&mut self) -> std::result::Result<(), GateError> {
        self.gate.as_mut().ok_or(GateError::NotOpen)?.begin_confirm()
    }

    /// Backend handle, for callers that issue the start request themselves
    pub fn api(&self) -> Arc<dyn AdminApi> {
        self.api.clone()
    }

    /// Issue the start request for a gate already in its busy sub-state
    ///
    /// On success the gate closes, the trigger is disabled and a polling
    /// session starts reporting on `events`. On failure the gate returns to
    /// its enabled state with the phrase intact and the trigger stays enabled.
    pub async fn submit(
        &mut self,
        events: mpsc::UnboundedSender<MonitorEvent>,
    ) -> std::result::Result<(), ConfirmError> {
        self.ensure_busy()?;
        let api = self.api.clone();
        let result = start_deep_reset(api.as_ref()).await;
        self.finish_start(result, events)
    }

    /// Apply the outcome of a start request issued elsewhere
    ///
    /// The counterpart of [`submit`](Self::submit) for front-ends that run
    /// [`start_deep_reset`] on a spawned task and must not block on it.
    pub fn finish_start(
        &mut self,
        result: Result<StartAck>,
        events: mpsc::UnboundedSender<MonitorEvent>,
    ) -> std::result::Result<(), ConfirmError> {
        self.ensure_busy()?;
        match result {
            Ok(_) => {
                self.gate = None;
                self.attach(events);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to start deep reset: {}", e);
                if let Some(gate) = self.gate.as_mut() {
                    gate.start_failed();
                }
                Err(e.into())
            }
        }
    }

    fn ensure_busy(&self) -> std::result::Result<(), GateError> {
        match &self.gate {
            Some(gate) if gate.is_busy() => Ok(()),
            Some(_) => Err(GateError::PhraseMismatch),
            None => Err(GateError::NotOpen),
        }
    }

    /// [`begin_confirm`](Self::begin_confirm) followed by [`submit`](Self::submit)
    pub async fn confirm(
        &mut self,
        events: mpsc::UnboundedSender<MonitorEvent>,
    ) -> std::result::Result<(), ConfirmError> {
        self.begin_confirm()?;
        self.submit(events).await
    }

    /// Disable the trigger and start polling without issuing a start request
    ///
    /// Used after a successful start and to re-attach to an operation that is
    /// already running server-side.
    pub fn attach(&mut self, events: mpsc::UnboundedSender<MonitorEvent>) {
        self.trigger.disable();
        self.session = Some(PollingSession::spawn(self.api.clone(), self.config, events));
    }

    /// Apply a session event to the trigger control
    pub fn observe(&mut self, event: &MonitorEvent) {
        if event.ends_operation() {
            self.trigger.restore();
        }
    }

    /// Stop the active session, if any, and restore the trigger
    pub fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel();
        }
        self.gate = None;
        self.trigger.restore();
    }

    /// Take ownership of the session handle, e.g. to await its outcome
    pub fn take_session(&mut self) -> Option<PollingHandle> {
        self.session.take()
    }
}
