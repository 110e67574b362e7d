//! Global state for the MCP server
//!
//! Session exclusivity and the client's requested log level.

use std::sync::atomic::{AtomicU8, Ordering};

use once_cell::sync::Lazy;
use rmcp::model::LoggingLevel;
use serde_json::{Map, Value};
use tokio::sync::Semaphore;

// ============================================================================
// Concurrency Control
// ============================================================================

/// One capture or reset at a time; a second caller is rejected, not queued
pub const MAX_CONCURRENT_SESSIONS: usize = 1;

pub static SESSION_SEMAPHORE: Lazy<Semaphore> =
    Lazy::new(|| Semaphore::new(MAX_CONCURRENT_SESSIONS));

pub const SESSION_BUSY_MESSAGE: &str =
    "Another capture or environment reset is already running. Wait for it to finish and try again.";

/// Whether a tool call drives the proxy session and must hold the session permit
///
/// Capture and filter calls with `duration_seconds == 0` only read the cache.
pub fn needs_exclusive_session(tool_name: &str, arguments: &Map<String, Value>) -> bool {
    match tool_name {
        "reset_environment" => true,
        "capture_session" | "filter_session" => arguments
            .get("duration_seconds")
            .and_then(Value::as_u64)
            .map(|seconds| seconds > 0)
            .unwrap_or(false),
        _ => false,
    }
}

// ============================================================================
// Client Log Level
// ============================================================================

fn level_rank(level: &LoggingLevel) -> u8 {
    match level {
        LoggingLevel::Debug => 0,
        LoggingLevel::Info => 1,
        LoggingLevel::Notice => 2,
        LoggingLevel::Warning => 3,
        LoggingLevel::Error => 4,
        LoggingLevel::Critical => 5,
        LoggingLevel::Alert => 6,
        LoggingLevel::Emergency => 7,
    }
}

/// Minimum level forwarded as `notifications/message`, set via `logging/setLevel`
static CLIENT_LOG_LEVEL: Lazy<AtomicU8> =
    Lazy::new(|| AtomicU8::new(level_rank(&LoggingLevel::Info)));

pub fn set_client_log_level(level: &LoggingLevel) {
    CLIENT_LOG_LEVEL.store(level_rank(level), Ordering::Relaxed);
}

pub fn client_wants(level: &LoggingLevel) -> bool {
    level_rank(level) >= CLIENT_LOG_LEVEL.load(Ordering::Relaxed)
}
