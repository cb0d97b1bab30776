//! Dashboard counters and the lightweight curation reset

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AdminApi;
use crate::errors::Result;

/// Counts for the dashboard cards, `GET /admin/stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationStats {
    /// ICD codes with at least one suggested mapping
    pub review: u64,
    /// ICD codes with at least one staged mapping
    pub master_map: u64,
    pub master_map_verified: u64,
    /// Rejected mappings (correction + orphan)
    pub rejected: u64,
}

/// How many suggested ICD codes have suggestions from 3, 2 or 1 systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletenessStats {
    pub three_systems: u64,
    pub two_systems: u64,
    pub one_system: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub curation: CurationStats,
    pub completeness: CompletenessStats,
}

/// Body of `POST /admin/reset-curation`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetCurationAck {
    pub status: Option<String>,
    pub message: Option<String>,
}

/// Fetch both counter endpoints concurrently
pub async fn fetch_dashboard(api: &dyn AdminApi) -> Result<DashboardStats> {
    let (curation, completeness) = futures::try_join!(api.stats(), api.completeness_stats())?;
    Ok(DashboardStats {
        curation,
        completeness,
    })
}

/// Trigger the curation reset and return the server's message
pub async fn reset_curation(api: &dyn AdminApi) -> Result<String> {
    let ack = api.reset_curation().await?;
    let message = ack
        .message
        .unwrap_or_else(|| "Curation reset initiated.".to_string());
    info!("Curation reset requested: {}", message);
    Ok(message)
}
