//! Access to the AYUR-SYNC admin API
//!
//! ## Architecture
//!
//! - [`transport`] - the raw request/response seam and its reqwest implementation
//! - [`client`] - [`ApiClient`], which adds auth headers and error translation
//!
//! Components that drive the deep reset depend on the [`AdminApi`] trait
//! rather than on the concrete client, so tests can script backend replies.

use async_trait::async_trait;

use crate::dashboard::{CompletenessStats, CurationStats, ResetCurationAck};
use crate::errors::Result;
use crate::status::{OperationStatus, StartAck};

pub mod client;
pub mod transport;

pub use client::ApiClient;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, RequestBody, ReqwestTransport};

/// Endpoint paths, relative to the configured base URL
pub mod paths {
    pub const LOGIN: &str = "/auth/token";
    pub const DEEP_RESET: &str = "/admin/deep-reset";
    pub const DEEP_RESET_STATUS: &str = "/admin/deep-reset-status";
    pub const STATS: &str = "/admin/stats";
    pub const COMPLETENESS_STATS: &str = "/admin/completeness-stats";
    pub const RESET_CURATION: &str = "/admin/reset-curation";
}

// ----------------------------------------------------------------------------
// Admin API Trait
// ----------------------------------------------------------------------------

/// Typed admin endpoints consumed by the monitor and dashboard
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// `POST /admin/deep-reset`; the body is returned as-is, unvalidated
    async fn start_deep_reset(&self) -> Result<StartAck>;

    /// `GET /admin/deep-reset-status`
    async fn deep_reset_status(&self) -> Result<OperationStatus>;

    /// `GET /admin/stats`
    async fn stats(&self) -> Result<CurationStats>;

    /// `GET /admin/completeness-stats`
    async fn completeness_stats(&self) -> Result<CompletenessStats>;

    /// `POST /admin/reset-curation`
    async fn reset_curation(&self) -> Result<ResetCurationAck>;
}
