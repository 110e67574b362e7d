// Captured session models
// Mirrors the document returned by the control API's export-json endpoint

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single recorded request/response pair.
///
/// The exported object is kept verbatim (field order included) so that the
/// pretty-printed form used for keyword search matches what was exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrafficEntry(Map<String, Value>);

impl TrafficEntry {
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Host the request was sent to, or an empty string when absent
    pub fn host(&self) -> &str {
        self.str_field("host")
    }

    /// HTTP method, or an empty string when absent
    pub fn method(&self) -> &str {
        self.str_field("method")
    }

    pub fn path(&self) -> &str {
        self.str_field("path")
    }

    /// Structured request document, `None` when missing or null
    pub fn request(&self) -> Option<&Value> {
        self.0.get("request").filter(|v| !v.is_null())
    }

    /// Structured response document, `None` when missing or null
    pub fn response(&self) -> Option<&Value> {
        self.0.get("response").filter(|v| !v.is_null())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    /// Two-space indented serialization used for line-based keyword search
    pub fn to_pretty_string(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_default()
    }

    fn str_field(&self, key: &str) -> &str {
        self.0.get(key).and_then(Value::as_str).unwrap_or("")
    }
}

/// Ordered sequence of traffic entries from one capture window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapturedSession {
    pub entries: Vec<TrafficEntry>,
}

impl CapturedSession {
    pub fn new(entries: Vec<TrafficEntry>) -> Self {
        Self { entries }
    }

    /// Parse the raw export-json document
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrafficEntry> {
        self.entries.iter()
    }

    pub fn to_value(&self) -> Value {
        Value::Array(
            self.entries
                .iter()
                .map(|e| Value::Object(e.fields().clone()))
                .collect(),
        )
    }
}

/// Filter settings for a single filter call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    /// Case-sensitive substring of the entry host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Case-insensitive exact HTTP method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Case-insensitive pattern searched line by line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_regex: Option<String>,
    #[serde(default = "default_true")]
    pub keep_request: bool,
    #[serde(default = "default_true")]
    pub keep_response: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            host: None,
            method: None,
            keyword_regex: None,
            keep_request: true,
            keep_response: true,
        }
    }
}

impl FilterCriteria {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_keyword_regex(mut self, pattern: impl Into<String>) -> Self {
        self.keyword_regex = Some(pattern.into());
        self
    }

    pub fn keep_request(mut self, keep: bool) -> Self {
        self.keep_request = keep;
        self
    }

    pub fn keep_response(mut self, keep: bool) -> Self {
        self.keep_response = keep;
        self
    }

    /// Host criterion, ignoring empty strings
    pub fn host_filter(&self) -> Option<&str> {
        non_empty(&self.host)
    }

    pub fn method_filter(&self) -> Option<&str> {
        non_empty(&self.method)
    }

    pub fn regex_filter(&self) -> Option<&str> {
        non_empty(&self.keyword_regex)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Where a keyword pattern first matched inside an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchLocation {
    /// 1-based line within the pretty-printed entry
    pub line_number: usize,
    /// Matching line with surrounding whitespace trimmed
    pub line_content: String,
}

/// Progress of one capture window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureWindowState {
    pub elapsed_seconds: u64,
    pub total_seconds: u64,
    pub cancelled: bool,
}

impl CaptureWindowState {
    pub fn new(total_seconds: u64) -> Self {
        Self {
            elapsed_seconds: 0,
            total_seconds,
            cancelled: false,
        }
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.total_seconds.saturating_sub(self.elapsed_seconds)
    }
}

/// Progress events emitted while a capture runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CaptureEvent {
    /// Previous session cleared, recording window opened
    Started { total_seconds: u64 },
    /// Emitted once per tick before waiting
    Tick {
        elapsed_seconds: u64,
        remaining_seconds: u64,
        total_seconds: u64,
    },
    /// Window closed, recording stopped, export in progress
    Exporting,
    /// Export written to the cache
    Saved { file_name: String, entries: usize },
    Cancelled { elapsed_seconds: u64 },
    Failed { message: String },
}

impl CaptureEvent {
    /// Human readable line for progress notifications
    pub fn describe(&self) -> String {
        match self {
            CaptureEvent::Started { total_seconds } => format!(
                "Cleared previous session, recording for {}s...",
                total_seconds
            ),
            CaptureEvent::Tick {
                elapsed_seconds,
                remaining_seconds,
                ..
            } => format!(
                "Recording... {}s elapsed, {}s remaining",
                elapsed_seconds, remaining_seconds
            ),
            CaptureEvent::Exporting => "Recording finished, exporting session...".to_string(),
            CaptureEvent::Saved { file_name, entries } => {
                format!("Saved {} entries to {}", entries, file_name)
            }
            CaptureEvent::Cancelled { elapsed_seconds } => {
                format!("Capture cancelled after {}s", elapsed_seconds)
            }
            CaptureEvent::Failed { message } => format!("Capture failed: {}", message),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CaptureEvent::Failed { .. })
    }
}
