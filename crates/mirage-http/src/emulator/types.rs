//! Type definitions for the emulator.
//!
//! This module contains the wire documents (response rules, responses,
//! request snapshots) and the error type shared by the emulator and the
//! predicate system.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Multi-valued map used for headers and query parameters.
pub type MultiMap = BTreeMap<String, Vec<String>>;

// ============================================================================
// Request Snapshot
// ============================================================================

/// Immutable capture of one inbound application request.
///
/// Built by the transport binding and returned verbatim by the history
/// endpoint, so the field names follow the emulator's JSON format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    #[serde(rename = "httpMethod")]
    pub method: String,
    pub url: String,
    #[serde(rename = "urlParameters", default)]
    pub params: MultiMap,
    #[serde(default)]
    pub headers: MultiMap,
    #[serde(default)]
    pub body: String,
}

impl RequestSnapshot {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// First value of a query parameter, if any.
    pub fn param(&self, name: &str) -> Option<&str> {
        first_value(self.params.get(name))
    }

    /// First value of a header, if any.
    ///
    /// Header names are compared exactly first and then ASCII
    /// case-insensitively; values are never case-folded.
    pub fn header(&self, name: &str) -> Option<&str> {
        let values = self.headers.get(name).or_else(|| {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        });
        first_value(values)
    }
}

fn first_value(values: Option<&Vec<String>>) -> Option<&str> {
    values.and_then(|v| v.first()).map(String::as_str)
}

impl fmt::Display for RequestSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{} {}", self.method, self.url),
        }
    }
}

// ============================================================================
// Response Rule Types
// ============================================================================

/// How long a registered rule remains servable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lifetime {
    /// Served once, then removed.
    SingleUse,
    /// Servable until the next reset.
    UntilReset,
    /// Survives resets.
    #[default]
    Forever,
}

impl Lifetime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::SingleUse => "SINGLE_USE",
            Lifetime::UntilReset => "UNTIL_RESET",
            Lifetime::Forever => "FOREVER",
        }
    }
}

/// Request type plus the DSL lines that must all hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateDefinition {
    #[serde(default)]
    pub request_type: String,
    #[serde(default)]
    pub rules: Vec<String>,
}

/// Latency applied before the response is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delay {
    /// Non-positive values mean no delay.
    #[serde(default, deserialize_with = "deserialize_delay_millis")]
    pub delay_time_in_millis: u64,
}

/// Canned response returned for a matching request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDefinition {
    #[serde(
        default = "default_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status_code: u16,
    #[serde(default, deserialize_with = "deserialize_header_values")]
    pub headers: MultiMap,
    #[serde(default)]
    pub body: String,
}

impl Default for ResponseDefinition {
    fn default() -> Self {
        Self {
            status_code: default_status_code(),
            headers: MultiMap::new(),
            body: String::new(),
        }
    }
}

/// Registration unit: predicate declaration plus the response to serve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRule {
    #[serde(default)]
    pub predicate: PredicateDefinition,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub time_to_live: Lifetime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Delay>,
    #[serde(default)]
    pub response: ResponseDefinition,
}

impl ResponseRule {
    /// Delay to apply before responding; zero when none is configured.
    pub fn delay_duration(&self) -> Duration {
        self.delay
            .map(|d| Duration::from_millis(d.delay_time_in_millis))
            .unwrap_or(Duration::ZERO)
    }
}

pub(crate) fn default_status_code() -> u16 {
    200
}

/// Deserialize statusCode from either a number or a string
pub(crate) fn deserialize_status_code<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| D::Error::custom("invalid status code number")),
        serde_json::Value::String(s) => s
            .parse::<u16>()
            .map_err(|_| D::Error::custom(format!("invalid status code string: {s}"))),
        _ => Err(D::Error::custom("statusCode must be a number or string")),
    }
}

/// Deserialize a signed millisecond count, clamping negatives to zero
pub(crate) fn deserialize_delay_millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let millis = i64::deserialize(deserializer)?;
    Ok(u64::try_from(millis).unwrap_or(0))
}

/// Deserialize header values given either as a single string or a list
pub(crate) fn deserialize_header_values<'de, D>(deserializer: D) -> Result<MultiMap, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HeaderValues {
        One(String),
        Many(Vec<String>),
    }

    let raw = BTreeMap::<String, HeaderValues>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, values)| match values {
            HeaderValues::One(v) => (name, vec![v]),
            HeaderValues::Many(v) => (name, v),
        })
        .collect())
}

// ============================================================================
// Error Types
// ============================================================================

/// Error types for rule registration and request serving
#[derive(Debug, thiserror::Error)]
pub enum EmulatorError {
    #[error("Rule [{0}] is not supported")]
    UnsupportedRule(String),
    #[error("Invalid rule definition: {0}")]
    InvalidRuleDefinition(String),
    #[error(
        "Received an unknown application request. Please ensure that there is a default \
         response set up which will match the following request [{0}]"
    )]
    NoMatchingRule(Box<RequestSnapshot>),
    #[error("No response registered for predicate [{0}]")]
    InconsistentRegistry(String),
    #[error("Interrupted while waiting {0}ms before responding")]
    DelayInterrupted(u64),
    #[error("Failed to load preset response file {}: {reason}", .path.display())]
    Preset { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_rule_defaults() {
        let json = r#"{
            "predicate": {"requestType": "Order", "rules": ["url contains 'order'"]},
            "response": {"body": "OK"}
        }"#;
        let rule: ResponseRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.priority, 0);
        assert_eq!(rule.time_to_live, Lifetime::Forever);
        assert!(rule.delay.is_none());
        assert_eq!(rule.delay_duration(), Duration::ZERO);
        assert_eq!(rule.response.status_code, 200);
        assert_eq!(rule.response.body, "OK");
    }

    #[test]
    fn test_negative_delay_means_no_delay() {
        let json = r#"{
            "predicate": {"requestType": "Order", "rules": ["url contains 'order'"]},
            "delay": {"delayTimeInMillis": -50},
            "response": {"body": "OK"}
        }"#;
        let rule: ResponseRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.delay.unwrap().delay_time_in_millis, 0);
        assert_eq!(rule.delay_duration(), Duration::ZERO);
    }

    #[test]
    fn test_response_rule_full_document() {
        let json = r#"{
            "predicate": {"requestType": "Payment", "rules": ["httpMethod is 'POST'"]},
            "priority": 5,
            "timeToLive": "SINGLE_USE",
            "delay": {"delayTimeInMillis": 250},
            "response": {
                "statusCode": "201",
                "headers": {"X-Single": "one", "X-Multi": ["a", "b"]},
                "body": "{\"id\":1}"
            },
            "ignored": true
        }"#;
        let rule: ResponseRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.priority, 5);
        assert_eq!(rule.time_to_live, Lifetime::SingleUse);
        assert_eq!(rule.delay_duration(), Duration::from_millis(250));
        assert_eq!(rule.response.status_code, 201);
        assert_eq!(rule.response.headers["X-Single"], vec!["one"]);
        assert_eq!(rule.response.headers["X-Multi"], vec!["a", "b"]);
    }

    #[test]
    fn test_lifetime_wire_names() {
        for lifetime in [Lifetime::SingleUse, Lifetime::UntilReset, Lifetime::Forever] {
            let json = serde_json::to_string(&lifetime).unwrap();
            assert_eq!(json, format!("\"{}\"", lifetime.as_str()));
        }
    }

    #[test]
    fn test_invalid_status_code_rejected() {
        let json = r#"{"statusCode": "abc"}"#;
        assert!(serde_json::from_str::<ResponseDefinition>(json).is_err());
    }

    #[test]
    fn test_snapshot_header_lookup_falls_back_to_case_insensitive() {
        let snapshot = RequestSnapshot::new("GET", "/")
            .with_header("x-trace", "abc")
            .with_header("X-Exact", "exact");
        assert_eq!(snapshot.header("X-Trace"), Some("abc"));
        assert_eq!(snapshot.header("X-Exact"), Some("exact"));
        assert_eq!(snapshot.header("missing"), None);
    }

    #[test]
    fn test_snapshot_param_first_value() {
        let snapshot = RequestSnapshot::new("GET", "/")
            .with_param("id", "1")
            .with_param("id", "2");
        assert_eq!(snapshot.param("id"), Some("1"));
        assert_eq!(snapshot.param("other"), None);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let snapshot = RequestSnapshot::new("GET", "/order/1").with_param("q", "x");
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["httpMethod"], "GET");
        assert_eq!(value["url"], "/order/1");
        assert_eq!(value["urlParameters"]["q"][0], "x");
        assert_eq!(value["body"], "");
    }

    #[test]
    fn test_no_matching_rule_message_names_request() {
        let err = EmulatorError::NoMatchingRule(Box::new(RequestSnapshot::new("GET", "/nope")));
        let msg = err.to_string();
        assert!(msg.contains("unknown application request"));
        assert!(msg.contains("/nope"));
    }
}
