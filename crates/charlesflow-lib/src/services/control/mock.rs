//! In-process stand-in for Charles used by tests.
//!
//! The control client routes every request through its configured proxy, so
//! the mock listens as that proxy and answers the absolute-form requests
//! itself.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::Router;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::ControlConfig;

pub const SAMPLE_EXPORT: &str = r#"[
  {
    "status": "COMPLETE",
    "method": "GET",
    "host": "api.example.com",
    "path": "/v1/users",
    "request": { "header": { "headers": [ { "name": "Accept", "value": "application/json" } ] } },
    "response": { "status": 200, "body": { "text": "{\"users\":[\"alice\"]}" } }
  },
  {
    "status": "COMPLETE",
    "method": "POST",
    "host": "auth.example.com",
    "path": "/login",
    "request": { "body": { "text": "user=alice&token=abc123" } },
    "response": { "status": 302 }
  }
]"#;

#[derive(Default)]
struct MockState {
    requests: Vec<String>,
    authorizations: Vec<Option<String>>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    export_body: String,
}

#[derive(Clone)]
pub struct MockCharles {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
}

async fn handle(
    State(state): State<Arc<Mutex<MockState>>>,
    uri: Uri,
    headers: HeaderMap,
) -> (StatusCode, String) {
    let path = uri.path().to_string();
    let (hang, fail, body) = {
        let mut s = state.lock().unwrap();
        s.requests.push(
            uri.path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| path.clone()),
        );
        s.authorizations.push(
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string()),
        );
        let body = if path == "/session/export-json" {
            s.export_body.clone()
        } else {
            "OK".to_string()
        };
        (s.hanging.contains(&path), s.failing.contains(&path), body)
    };

    if hang {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
    if fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "error".to_string());
    }
    (StatusCode::OK, body)
}

impl MockCharles {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(MockState {
            export_body: SAMPLE_EXPORT.to_string(),
            ..Default::default()
        }));
        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, state }
    }

    pub fn control_config(&self) -> ControlConfig {
        ControlConfig {
            proxy_url: format!("http://{}", self.addr),
            request_timeout_secs: 2,
            quit_timeout_secs: 1,
            quit_grace_millis: 0,
            ..ControlConfig::default()
        }
    }

    /// Points at a port nothing listens on
    pub fn unreachable_config() -> ControlConfig {
        ControlConfig {
            proxy_url: "http://127.0.0.1:1".to_string(),
            request_timeout_secs: 1,
            quit_timeout_secs: 1,
            quit_grace_millis: 0,
            ..ControlConfig::default()
        }
    }

    pub fn fail(&self, path: &str) {
        self.state.lock().unwrap().failing.insert(path.to_string());
    }

    pub fn hang(&self, path: &str) {
        self.state.lock().unwrap().hanging.insert(path.to_string());
    }

    pub fn set_export_body(&self, body: &str) {
        self.state.lock().unwrap().export_body = body.to_string();
    }

    pub fn export_body(&self) -> String {
        self.state.lock().unwrap().export_body.clone()
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn authorizations(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().authorizations.clone()
    }
}
