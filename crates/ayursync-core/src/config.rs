//! Runtime configuration for the API client and the deep reset monitor

use std::time::Duration;

use crate::errors::ConfigError;

/// Default backend base URL for local development
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

// ----------------------------------------------------------------------------
// API Configuration
// ----------------------------------------------------------------------------

/// Where and how to reach the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix
    pub base_url: String,
    /// Per-request timeout applied by the HTTP transport
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Base URL without a trailing slash, ready for endpoint concatenation
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Monitor Configuration
// ----------------------------------------------------------------------------

/// Timing for a deep reset polling session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Delay between the end of one poll and the start of the next
    pub poll_interval: Duration,
    /// Delay between the completion marker and navigation to new suggestions
    pub redirect_delay: Duration,
    /// Stop after this many polls; `None` polls until a terminal state
    pub max_poll_attempts: Option<u32>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2500),
            redirect_delay: Duration::from_millis(1200),
            max_poll_attempts: None,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Validation(
                "Poll interval must be greater than 0".to_string(),
            ));
        }
        if self.max_poll_attempts == Some(0) {
            return Err(ConfigError::Validation(
                "Maximum poll attempts must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}
