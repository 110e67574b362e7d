//! Capture progress forwarding
//!
//! Drains the capture event channel and relays each event to the client as a
//! logging notification and, when the request carried a progress token, as a
//! progress notification.

use charlesflow_lib::models::CaptureEvent;
use rmcp::model::{
    LoggingLevel, LoggingMessageNotificationParam, ProgressNotificationParam, ProgressToken,
};
use rmcp::service::Peer;
use rmcp::RoleServer;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

use super::state::client_wants;

pub const LOGGER_NAME: &str = "charlesflow.capture";

pub fn logging_level(event: &CaptureEvent) -> LoggingLevel {
    match event {
        CaptureEvent::Failed { .. } => LoggingLevel::Error,
        CaptureEvent::Cancelled { .. } => LoggingLevel::Warning,
        _ => LoggingLevel::Info,
    }
}

/// Turns events into strictly increasing `(progress, total)` pairs
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total: Option<u64>,
}

impl ProgressTracker {
    pub fn advance(&mut self, event: &CaptureEvent) -> Option<(f64, Option<f64>)> {
        match event {
            CaptureEvent::Started { total_seconds } => {
                self.total = Some(*total_seconds);
                None
            }
            CaptureEvent::Tick {
                elapsed_seconds,
                total_seconds,
                ..
            } => Some((*elapsed_seconds as f64, Some(*total_seconds as f64))),
            CaptureEvent::Exporting => self.total.map(|t| (t as f64, Some(t as f64))),
            _ => None,
        }
    }
}

pub async fn forward_capture_events(
    mut events: UnboundedReceiver<CaptureEvent>,
    peer: Peer<RoleServer>,
    progress_token: Option<ProgressToken>,
) {
    let mut tracker = ProgressTracker::default();

    while let Some(event) = events.recv().await {
        let message = event.describe();
        let level = logging_level(&event);

        if client_wants(&level) {
            let notification = LoggingMessageNotificationParam {
                level,
                logger: Some(LOGGER_NAME.to_string()),
                data: json!({ "message": message, "event": event }),
            };
            if let Err(e) = peer.notify_logging_message(notification).await {
                log::debug!("[MCP Progress] Logging notification not delivered: {}", e);
            }
        }

        let step = tracker.advance(&event);
        if let (Some(token), Some((progress, total))) = (progress_token.as_ref(), step) {
            let notification = ProgressNotificationParam {
                progress_token: token.clone(),
                progress,
                total,
                message: Some(message),
            };
            if let Err(e) = peer.notify_progress(notification).await {
                log::debug!("[MCP Progress] Progress notification not delivered: {}", e);
            }
        }
    }
}
