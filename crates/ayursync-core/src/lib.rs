//! AYUR-SYNC Admin Core
//!
//! This crate provides the client side of the AYUR-SYNC admin surface: the
//! authenticated API wrapper, the typed admin endpoints, and the long-running
//! "deep reset" monitor (confirmation gate, operation start, status polling and
//! progress rendering). It is UI-agnostic; the CLI and TUI front-ends consume
//! [`MonitorEvent`]s and [`StatusView`]s produced here.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod gate;
pub mod monitor;
pub mod operation;
pub mod render;
pub mod status;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use api::{
    AdminApi, ApiClient, HttpRequest, HttpResponse, HttpTransport, Method, RequestBody,
    ReqwestTransport,
};
pub use auth::SessionStore;
pub use config::{ApiConfig, MonitorConfig, DEFAULT_API_BASE_URL};
pub use dashboard::{
    fetch_dashboard, reset_curation, CompletenessStats, CurationStats, DashboardStats,
    ResetCurationAck,
};
pub use errors::{ApiError, ConfigError, GateError, Result};
pub use gate::{ConfirmationGate, CONFIRMATION_PHRASE};
pub use monitor::{Destination, MonitorEvent, PollingHandle, PollingSession, SessionOutcome};
pub use operation::{start_deep_reset, ConfirmError, DeepResetController, TriggerControl};
pub use render::{escape_html, render_status, LogLine, StatusView};
pub use status::{OperationState, OperationStatus, StartAck, StepEntry};
