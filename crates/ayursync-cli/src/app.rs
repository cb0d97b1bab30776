//! Admin client application state shared by every command

use std::sync::Arc;

use tracing::{debug, info};

use ayursync_core::{
    fetch_dashboard, reset_curation, AdminApi, ApiClient, ApiError, DashboardStats,
    DeepResetController, SessionStore,
};

use crate::config::AdminConfig;
use crate::error::{CliError, Result};

/// Configuration, session and API client for one CLI invocation
#[derive(Clone)]
pub struct AdminApp {
    config: AdminConfig,
    session: SessionStore,
    client: Arc<ApiClient>,
}

impl AdminApp {
    /// Open the token file and build the HTTP client
    pub fn new(config: AdminConfig) -> Result<Self> {
        let token_path = config.token_path()?;
        debug!("Using token file {}", token_path.display());
        let session = SessionStore::with_token_file(&token_path)?;
        let client = ApiClient::new(config.api_config(), session.clone())?;
        Ok(Self::from_parts(config, session, client))
    }

    /// Assemble an app around an existing client, e.g. one with a scripted transport
    pub fn from_parts(config: AdminConfig, session: SessionStore, client: ApiClient) -> Self {
        Self {
            config,
            session,
            client: Arc::new(client),
        }
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn api(&self) -> Arc<dyn AdminApi> {
        self.client.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Fail early when no token is stored
    pub fn require_login(&self) -> Result<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(CliError::Api(ApiError::NotAuthenticated))
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        info!("Logging in as {}", username);
        self.client.login(username, password).await?;
        Ok(())
    }

    pub fn logout(&self) {
        self.client.logout();
    }

    /// A fresh deep reset controller bound to this app's API and monitor settings
    pub fn controller(&self) -> DeepResetController {
        DeepResetController::new(self.api(), self.config.monitor_config())
    }

    pub async fn dashboard(&self) -> Result<DashboardStats> {
        Ok(fetch_dashboard(self.client.as_ref()).await?)
    }

    pub async fn reset_curation(&self) -> Result<String> {
        Ok(reset_curation(self.client.as_ref()).await?)
    }
}
