//! Tool result shaping
//!
//! Capture and filter return JSON entry arrays; failures come back as a
//! single `[{"error": "..."}]` entry with `isError` set. Throttle and reset
//! return plain status text.

use charlesflow_lib::models::{ShutdownReport, ThrottlePreset};
use charlesflow_lib::services::{CaptureError, ControlError, SessionFilter};
use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
use serde::Serialize;

use super::types::FilterSessionParams;

fn to_json<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))
}

pub fn entries_result<T: Serialize>(entries: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(to_json(entries)?)]))
}

pub fn capture_error_result(err: &CaptureError) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(to_json(
        &err.to_entries(),
    )?)]))
}

pub fn validation_error(message: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message.into())])
}

/// Reject bad filter arguments before anything touches Charles or the cache
pub fn validate_filter_params(params: &FilterSessionParams) -> Result<(), String> {
    if params.session_file().is_some() && params.duration_seconds > 0 {
        return Err("session_file can only be used with duration_seconds = 0".to_string());
    }
    if let Some(pattern) = params.criteria().regex_filter() {
        SessionFilter::validate_regex(pattern).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// `Success: <preset>`; unknown presets get the rejection message alone
pub fn throttle_result(outcome: Result<ThrottlePreset, ControlError>) -> CallToolResult {
    match outcome {
        Ok(preset) => CallToolResult::success(vec![Content::text(format!("Success: {}", preset))]),
        Err(ControlError::InvalidPreset(e)) => validation_error(e.to_string()),
        Err(e) => CallToolResult::error(vec![Content::text(format!("Error: {}", e))]),
    }
}

pub fn reset_result(report: &ShutdownReport) -> CallToolResult {
    let text = Content::text(report.summary());
    if report.is_success() {
        CallToolResult::success(vec![text])
    } else {
        CallToolResult::error(vec![text])
    }
}
