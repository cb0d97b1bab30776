//! Authenticated API wrapper
//!
//! Every request carries the bearer token and `Cache-Control: no-cache`.
//! Responses are translated as follows:
//!
//! - 401 clears the session (global logout) and fails with [`ApiError::Unauthorized`]
//! - other non-2xx fail with the body's `detail`, or a generic message
//! - 2xx JSON is parsed; 2xx without a JSON content type yields `{}`

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::paths;
use super::transport::{HttpRequest, HttpResponse, HttpTransport, Method, RequestBody, ReqwestTransport};
use super::AdminApi;
use crate::auth::SessionStore;
use crate::config::ApiConfig;
use crate::dashboard::{CompletenessStats, CurationStats, ResetCurationAck};
use crate::errors::{ApiError, Result};
use crate::status::{OperationStatus, StartAck};

/// Message used when the login endpoint gives no detail
const LOGIN_FAILED: &str = "Login failed.";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

// ----------------------------------------------------------------------------
// API Client
// ----------------------------------------------------------------------------

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    config: ApiConfig,
    session: SessionStore,
}

impl ApiClient {
    /// Client backed by the reqwest transport
    pub fn new(config: ApiConfig, session: SessionStore) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(Arc::new(transport), config, session))
    }

    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        config: ApiConfig,
        session: SessionStore,
    ) -> Self {
        Self {
            transport,
            config,
            session,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.normalized_base_url(), endpoint)
    }

    /// Issue an authenticated request and translate the response
    pub async fn fetch_api(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        let token = self.session.token().ok_or(ApiError::NotAuthenticated)?;

        let mut request = HttpRequest::new(method, self.url(endpoint))
            .with_header("Authorization", format!("Bearer {}", token))
            .with_header("Cache-Control", "no-cache");
        if let Some(body) = body {
            request = request
                .with_header("Content-Type", "application/json")
                .with_body(RequestBody::Json(body));
        }

        debug!("{} {}", method.as_str(), endpoint);
        let response = self.transport.execute(request).await?;
        self.translate(endpoint, response)
    }

    fn translate(&self, endpoint: &str, response: HttpResponse) -> Result<Value> {
        if response.status == 401 {
            warn!("{} returned 401, clearing session", endpoint);
            self.session.logout();
            return Err(ApiError::Unauthorized);
        }

        if !response.is_success() {
            return Err(ApiError::Http {
                status: response.status,
                detail: error_detail(&response, None),
            });
        }

        if response.is_json() {
            Ok(serde_json::from_slice(&response.body)?)
        } else {
            Ok(Value::Object(Map::new()))
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let value = self.fetch_api(Method::Get, endpoint, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let value = self.fetch_api(Method::Post, endpoint, body).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Exchange credentials for a bearer token and store it in the session
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let request = HttpRequest::new(Method::Post, self.url(paths::LOGIN)).with_body(
            RequestBody::Form(vec![
                ("username".to_string(), username.to_string()),
                ("password".to_string(), password.to_string()),
            ]),
        );

        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(ApiError::Login(error_detail(&response, Some(LOGIN_FAILED))));
        }

        let token: TokenResponse = serde_json::from_slice(&response.body)?;
        self.session.store(token.access_token)?;
        Ok(())
    }

    pub fn logout(&self) {
        self.session.logout();
    }
}

/// Error text for a failed response
///
/// Uses the JSON `detail` field when present. FastAPI validation errors send a
/// list there, which is flattened to its JSON text.
fn error_detail(response: &HttpResponse, fallback: Option<&str>) -> String {
    let detail = serde_json::from_slice::<Value>(&response.body)
        .ok()
        .and_then(|body| body.get("detail").cloned())
        .and_then(|detail| match detail {
            Value::String(text) => Some(text),
            Value::Null => None,
            other => Some(other.to_string()),
        });

    detail.unwrap_or_else(|| match fallback {
        Some(text) => text.to_string(),
        None => format!("An unknown error occurred ({})", response.status),
    })
}

// ----------------------------------------------------------------------------
// Admin Endpoints
// ----------------------------------------------------------------------------

#[async_trait]
impl AdminApi for ApiClient {
    async fn start_deep_reset(&self) -> Result<StartAck> {
        self.post_json(paths::DEEP_RESET, None).await
    }

    async fn deep_reset_status(&self) -> Result<OperationStatus> {
        self.get_json(paths::DEEP_RESET_STATUS).await
    }

    async fn stats(&self) -> Result<CurationStats> {
        self.get_json(paths::STATS).await
    }

    async fn completeness_stats(&self) -> Result<CompletenessStats> {
        self.get_json(paths::COMPLETENESS_STATS).await
    }

    async fn reset_curation(&self) -> Result<ResetCurationAck> {
        self.post_json(paths::RESET_CURATION, None).await
    }
}
