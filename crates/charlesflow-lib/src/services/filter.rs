// Session Filter
// Host/method/keyword filtering over a captured session
//
// Pure and read-only. Keyword search runs line by line over the two-space
// pretty-printed entry and stops at the first matching line.

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use thiserror::Error;

use crate::models::{CapturedSession, FilterCriteria, MatchLocation, TrafficEntry};

/// Field added to entries matched by a keyword pattern
pub const MATCH_LOCATION_FIELD: &str = "matchLocation";

#[derive(Error, Debug)]
#[error("Invalid keyword_regex '{pattern}': {message}")]
pub struct InvalidPatternError {
    pub pattern: String,
    pub message: String,
}

pub struct SessionFilter;

impl SessionFilter {
    fn compile(pattern: &str) -> Result<Regex, regex::Error> {
        RegexBuilder::new(pattern).case_insensitive(true).build()
    }

    /// Check a keyword pattern up front so callers can reject it before
    /// doing any work
    pub fn validate_regex(pattern: &str) -> Result<(), InvalidPatternError> {
        Self::compile(pattern)
            .map(|_| ())
            .map_err(|e| InvalidPatternError {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }

    /// First line of the entry's pretty-printed form that matches `regex`
    pub fn locate(entry: &TrafficEntry, regex: &Regex) -> Option<MatchLocation> {
        entry
            .to_pretty_string()
            .lines()
            .enumerate()
            .find(|(_, line)| regex.is_match(line))
            .map(|(index, line)| MatchLocation {
                line_number: index + 1,
                line_content: line.trim().to_string(),
            })
    }

    /// Apply `criteria` to every entry, keeping session order
    ///
    /// An invalid keyword pattern matches nothing.
    pub fn filter(criteria: &FilterCriteria, session: &CapturedSession) -> Vec<Value> {
        let regex = match criteria.regex_filter().map(Self::compile) {
            Some(Ok(regex)) => Some(regex),
            Some(Err(e)) => {
                log::warn!("[SessionFilter] Invalid keyword pattern, excluding all entries: {}", e);
                return Vec::new();
            }
            None => None,
        };

        session
            .iter()
            .filter_map(|entry| Self::apply(criteria, regex.as_ref(), entry))
            .collect()
    }

    fn apply(
        criteria: &FilterCriteria,
        regex: Option<&Regex>,
        entry: &TrafficEntry,
    ) -> Option<Value> {
        if let Some(host) = criteria.host_filter() {
            if !entry.host().contains(host) {
                return None;
            }
        }
        if let Some(method) = criteria.method_filter() {
            if !entry.method().eq_ignore_ascii_case(method) {
                return None;
            }
        }

        let location = match regex {
            Some(regex) => Some(Self::locate(entry, regex)?),
            None => None,
        };

        let mut fields = entry.fields().clone();
        if !criteria.keep_request {
            fields.shift_remove("request");
        }
        if !criteria.keep_response {
            fields.shift_remove("response");
        }
        if let Some(location) = location {
            fields.insert(
                MATCH_LOCATION_FIELD.to_string(),
                serde_json::to_value(location).unwrap_or(Value::Null),
            );
        }
        Some(Value::Object(fields))
    }
}
