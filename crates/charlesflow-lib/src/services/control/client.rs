// Charles Control API Client
// Typed calls against http://control.charles, routed through the Charles proxy

use reqwest::{Client, Proxy, Response};
use std::time::Duration;

use super::error::{ControlError, ControlResult};
use crate::models::{ControlConfig, ThrottlePreset};

pub const SESSION_CLEAR: &str = "/session/clear";
pub const RECORDING_STOP: &str = "/recording/stop";
pub const SESSION_EXPORT_JSON: &str = "/session/export-json";
pub const THROTTLING_ACTIVATE: &str = "/throttling/activate";
pub const THROTTLING_DEACTIVATE: &str = "/throttling/deactivate";
pub const QUIT: &str = "/quit";

/// What happened when quit was requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuitOutcome {
    Acknowledged,
    /// Charles closed (or was never running) before answering
    NoResponse(String),
}

impl QuitOutcome {
    pub fn describe(&self) -> String {
        match self {
            QuitOutcome::Acknowledged => "quit acknowledged".to_string(),
            QuitOutcome::NoResponse(reason) => format!("no response to quit ({})", reason),
        }
    }
}

/// HTTP client for the Charles control endpoints
#[derive(Debug, Clone)]
pub struct ControlClient {
    http: Client,
    config: ControlConfig,
}

impl ControlClient {
    /// Validate the config and build the proxied client
    pub fn new(config: ControlConfig) -> ControlResult<Self> {
        config.validate()?;

        let proxy = Proxy::all(&config.proxy_url)
            .map_err(|e| ControlError::Client(format!("invalid proxy: {}", e)))?;
        let http = Client::builder()
            .proxy(proxy)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ControlError::Client(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    async fn get(&self, endpoint: &str, timeout: Duration) -> ControlResult<Response> {
        let url = self.url(endpoint);
        log::debug!("[ControlClient] GET {}", url);

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ControlError::Timeout {
                        endpoint: endpoint.to_string(),
                        seconds: timeout.as_secs(),
                    }
                } else {
                    ControlError::Connection {
                        endpoint: endpoint.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ControlError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn call(&self, endpoint: &str) -> ControlResult<()> {
        self.get(endpoint, self.config.request_timeout()).await?;
        Ok(())
    }

    /// Discard the current session and start a fresh recording
    pub async fn clear_session(&self) -> ControlResult<()> {
        self.call(SESSION_CLEAR).await
    }

    pub async fn stop_recording(&self) -> ControlResult<()> {
        self.call(RECORDING_STOP).await
    }

    /// Raw JSON document of the current session
    pub async fn export_session_json(&self) -> ControlResult<String> {
        let response = self
            .get(SESSION_EXPORT_JSON, self.config.request_timeout())
            .await?;
        response.text().await.map_err(|e| ControlError::Body {
            endpoint: SESSION_EXPORT_JSON.to_string(),
            message: e.to_string(),
        })
    }

    /// Activate a throttling preset, or deactivate throttling
    pub async fn set_throttle(&self, preset: ThrottlePreset) -> ControlResult<()> {
        if preset.is_deactivate() {
            return self.call(THROTTLING_DEACTIVATE).await;
        }
        // wire names are already URL-encoded
        let endpoint = format!("{}?preset={}", THROTTLING_ACTIVATE, preset.wire_name());
        self.call(&endpoint).await
    }

    /// Apply a preset given by name (aliases accepted). Unknown names are
    /// rejected without contacting Charles.
    pub async fn set_throttle_by_name(&self, name: &str) -> ControlResult<ThrottlePreset> {
        let preset: ThrottlePreset = name.parse()?;
        self.set_throttle(preset).await?;
        log::info!("[ControlClient] Throttling set to {}", preset);
        Ok(preset)
    }

    /// Ask Charles to quit. Never fails: a silent quit is the expected case.
    pub async fn quit(&self) -> QuitOutcome {
        match self.get(QUIT, self.config.quit_timeout()).await {
            Ok(_) => {
                log::info!("[ControlClient] Charles acknowledged quit");
                QuitOutcome::Acknowledged
            }
            Err(e) => {
                log::debug!("[ControlClient] Quit not acknowledged: {}", e);
                QuitOutcome::NoResponse(e.to_string())
            }
        }
    }
}
