//! Scripted admin backend for exercising command handlers and the TUI
//!
//! Replies are queued per endpoint. The last reply queued for an endpoint is
//! repeated once the queue is down to it, so a single `completed` snapshot
//! answers every later poll.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use ayursync_core::api::paths;
use ayursync_core::{
    ApiClient, HttpRequest, HttpResponse, HttpTransport, Method, Result, SessionStore,
};

use crate::app::AdminApp;
use crate::config::AdminConfig;

struct Route {
    method: Method,
    path: &'static str,
    replies: VecDeque<HttpResponse>,
}

#[derive(Default)]
pub struct ScriptedBackend {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
    hold: Option<Arc<Notify>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backend that answers nothing until [`release`](Self::release) is called
    pub fn held() -> Arc<Self> {
        Arc::new(Self {
            hold: Some(Arc::new(Notify::new())),
            ..Self::default()
        })
    }

    /// Let one held request through
    pub fn release(&self) {
        if let Some(hold) = &self.hold {
            hold.notify_one();
        }
    }

    pub fn reply(&self, method: Method, path: &'static str, status: u16, body: Value) {
        let response = HttpResponse::json(status, &body);
        let mut routes = self.routes.lock().unwrap();
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
        {
            Some(route) => route.replies.push_back(response),
            None => routes.push(Route {
                method,
                path,
                replies: VecDeque::from([response]),
            }),
        }
    }

    pub fn accept_start(&self) {
        self.reply(Method::Post, paths::DEEP_RESET, 200, json!({"status": "accepted"}));
    }

    pub fn report_status(&self, body: Value) {
        self.reply(Method::Get, paths::DEEP_RESET_STATUS, 200, body);
    }

    pub fn serve_dashboard(&self, review: u64) {
        self.reply(
            Method::Get,
            paths::STATS,
            200,
            json!({"review": review, "master_map": 4, "master_map_verified": 1, "rejected": 2}),
        );
        self.reply(
            Method::Get,
            paths::COMPLETENESS_STATS,
            200,
            json!({"three_systems": 1, "two_systems": 2, "one_system": 3}),
        );
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// How many requests hit `method path`
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.url.ends_with(path))
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedBackend {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.requests.lock().unwrap().push(request.clone());

        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| r.method == request.method && request.url.ends_with(r.path));
        let response = match route {
            Some(route) if route.replies.len() > 1 => route.replies.pop_front(),
            Some(route) => route.replies.front().cloned(),
            None => None,
        };
        Ok(response.unwrap_or_else(|| HttpResponse::json(404, &json!({"detail": "Not Found"}))))
    }
}

/// Defaults with millisecond poll and redirect timers
pub fn fast_config() -> AdminConfig {
    let mut config = AdminConfig::default();
    config.monitor.poll_interval_ms = 5;
    config.monitor.redirect_delay_ms = 5;
    config.cli.colored_output = false;
    config
}

/// Logged-in app over `backend` using [`fast_config`]
pub fn scripted_app(backend: Arc<ScriptedBackend>) -> AdminApp {
    scripted_app_with(backend, fast_config())
}

pub fn scripted_app_with(backend: Arc<ScriptedBackend>, config: AdminConfig) -> AdminApp {
    let session = SessionStore::in_memory(Some("test-token".into()));
    let client = ApiClient::with_transport(backend, config.api_config(), session.clone());
    AdminApp::from_parts(config, session, client)
}
