//! Type definitions for MCP tool parameters
//!
//! Parameter structs derive `JsonSchema` so rmcp can publish the input schema
//! of every tool.

use charlesflow_lib::models::FilterCriteria;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// Default Value Helper Functions
// ============================================================================

pub fn default_true() -> bool {
    true
}

// ============================================================================
// Parameter Types for Tools (must derive JsonSchema)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CaptureSessionParams {
    /// Seconds to record live traffic. 0 returns the most recently cached
    /// session without recording.
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FilterSessionParams {
    /// Seconds to record before filtering. 0 filters a cached session instead.
    pub duration_seconds: u64,
    /// Keep entries whose host contains this text (case-sensitive)
    #[serde(default)]
    pub host: Option<String>,
    /// Keep entries with this HTTP method (case-insensitive)
    #[serde(default)]
    pub method: Option<String>,
    /// Case-insensitive regex searched line by line in each entry; the first
    /// matching line is reported as matchLocation
    #[serde(default)]
    pub keyword_regex: Option<String>,
    /// Include the request object in results (default: true)
    #[serde(default = "default_true")]
    pub keep_request: bool,
    /// Include the response object in results (default: true)
    #[serde(default = "default_true")]
    pub keep_response: bool,
    /// Cached session file to filter (e.g. 20240501120000.chlsj). Only valid
    /// with duration_seconds = 0; defaults to the latest session.
    #[serde(default)]
    pub session_file: Option<String>,
}

impl FilterSessionParams {
    pub fn criteria(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria::default()
            .keep_request(self.keep_request)
            .keep_response(self.keep_response);
        if let Some(host) = &self.host {
            criteria = criteria.with_host(host.clone());
        }
        if let Some(method) = &self.method {
            criteria = criteria.with_method(method.clone());
        }
        if let Some(pattern) = &self.keyword_regex {
            criteria = criteria.with_keyword_regex(pattern.clone());
        }
        criteria
    }

    /// Named cached file, ignoring blank values
    pub fn session_file(&self) -> Option<&str> {
        self.session_file
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetThrottlingParams {
    /// Preset name: 3G, 4G, 100+Mbps+Fibre, 32+Mbps+Fibre, 16+Mbps+ADSL2%2B,
    /// 8+Mbps+ADSL2, 2+Mbps+ADSL, 32+Mbps+VDSL, 256+kbps+ISDN%2FDSL,
    /// 512+kbps+ISDN%2FDSL, 56+kbps+Modem, or deactivate. start/on mean 3G.
    pub preset: String,
}
