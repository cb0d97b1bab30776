//! Error types for the AYUR-SYNC admin client
//!
//! Network, HTTP and decoding failures inside the API wrapper all collapse into
//! [`ApiError`], which always carries a human-readable message. Gate and
//! configuration failures have their own small enums.

// ----------------------------------------------------------------------------
// API Errors
// ----------------------------------------------------------------------------

/// Errors produced by the API wrapper and the typed admin endpoints
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered 401; the stored session has already been cleared.
    #[error("401 Unauthorized. Logging out.")]
    Unauthorized,

    /// No bearer token is available for an authenticated request
    #[error("Not logged in. Run `ayursync login` first.")]
    NotAuthenticated,

    /// Non-2xx response; `detail` comes from the body or a generic fallback
    #[error("{detail}")]
    Http { status: u16, detail: String },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Transport(String),

    /// A response body could not be decoded into the expected shape
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Transport succeeded but the body lacked the expected marker
    #[error("{0}")]
    UnexpectedResponse(String),

    #[error("{0}")]
    Login(String),

    /// The session token could not be persisted or removed
    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl ApiError {
    /// Whether this error ends the authenticated session
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::NotAuthenticated)
    }

    /// HTTP status associated with the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Gate Errors
// ----------------------------------------------------------------------------

/// Reasons a confirmation attempt is refused before any request is made
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("Type RESET ALL to enable the button")]
    PhraseMismatch,

    #[error("A start request is already in flight")]
    Busy,

    #[error("No confirmation dialog is open")]
    NotOpen,

    #[error("The deep reset trigger is disabled while an operation is running")]
    TriggerDisabled,
}

// ----------------------------------------------------------------------------
// Configuration Errors
// ----------------------------------------------------------------------------

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Result type for API operations
pub type Result<T> = core::result::Result<T, ApiError>;
