//! Wire types for the deep reset endpoints
//!
//! `GET /admin/deep-reset-status` returns a cumulative snapshot of the
//! operation: the full step log so far, not a delta. `POST /admin/deep-reset`
//! returns an acknowledgement whose `status` must read `accepted`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker the backend uses to acknowledge a started operation
pub const ACCEPTED_MARKER: &str = "accepted";

// ----------------------------------------------------------------------------
// Operation State
// ----------------------------------------------------------------------------

/// Server-reported lifecycle state of the long-running operation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum OperationState {
    /// Implicit state before the first successful poll
    #[default]
    NotStarted,
    Running,
    Completed,
    Error,
    /// Any state string the client does not recognise
    Unknown(String),
}

impl OperationState {
    pub fn as_str(&self) -> &str {
        match self {
            OperationState::NotStarted => "not-started",
            OperationState::Running => "running",
            OperationState::Completed => "completed",
            OperationState::Error => "error",
            OperationState::Unknown(other) => other,
        }
    }
}

impl From<String> for OperationState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "running" => OperationState::Running,
            "completed" => OperationState::Completed,
            "error" => OperationState::Error,
            "not-started" | "idle" | "" => OperationState::NotStarted,
            _ => OperationState::Unknown(value),
        }
    }
}

/// An explicit `null` state reads as an operation still in progress
impl From<Option<String>> for OperationState {
    fn from(value: Option<String>) -> Self {
        value.map_or(OperationState::Running, OperationState::from)
    }
}

impl From<OperationState> for String {
    fn from(state: OperationState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Status Snapshot
// ----------------------------------------------------------------------------

/// One line of the server-side step log
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepEntry {
    /// ISO-8601 timestamp
    #[serde(rename = "ts", default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(rename = "msg", default, deserialize_with = "null_as_default")]
    pub message: String,
}

impl StepEntry {
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            message: message.into(),
        }
    }
}

/// Snapshot returned by the status endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperationStatus {
    #[serde(default)]
    pub state: OperationState,
    /// Fractional completion in [0.0, 1.0]; absent means 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<StepEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationStatus {
    pub fn running(progress: f64) -> Self {
        Self {
            state: OperationState::Running,
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn completed() -> Self {
        Self {
            state: OperationState::Completed,
            progress: Some(1.0),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: OperationState::Error,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_steps(mut self, steps: Vec<StepEntry>) -> Self {
        self.steps = steps;
        self
    }

    /// Error text for notifications, `Unknown` when the server sent none
    pub fn error_message(&self) -> String {
        match self.error.as_deref() {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => "Unknown".to_string(),
        }
    }
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ----------------------------------------------------------------------------
// Start Acknowledgement
// ----------------------------------------------------------------------------

/// Body of `POST /admin/deep-reset`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StartAck {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StartAck {
    pub fn is_accepted(&self) -> bool {
        self.status.as_deref() == Some(ACCEPTED_MARKER)
    }
}
