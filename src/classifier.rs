//! The response classifier (C4, §4.4).
//!
//! `DecisionRule` is the closed rule alphabet; `classify` is the pure
//! function mapping a probe's raw response to a `ProbeState`. Adding a new
//! site behaviour means adding a new `DecisionRule` variant here, never a
//! bespoke per-site function (§9 REDESIGN FLAGS).

use serde::Serialize;

/// The outcome state of one classified probe (§3 `ProbeOutcome.state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeState {
    Present,
    Absent,
    Indeterminate,
    Error,
}

impl ProbeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeState::Present => "present",
            ProbeState::Absent => "absent",
            ProbeState::Indeterminate => "indeterminate",
            ProbeState::Error => "error",
        }
    }
}

/// A response as seen by the classifier — deliberately narrow: only what
/// a decision rule can ever need.
#[derive(Debug, Clone)]
pub struct ClassifierInput<'a> {
    pub status: u16,
    pub final_url: &'a str,
    pub body: &'a [u8],
}

/// Built-in substrings in a final URL that indicate a generic
/// "not found"/"error" landing page even when the HTTP status is 200
/// (§4.4 `StatusExists` notes).
const REDIRECTED_TO_ERROR_PATTERNS: &[&str] = &["/404", "/error", "/notfound"];

/// Default expected status for rules that need the response body or JSON
/// to have actually been served by the happy path before trusting it (§4.4
/// precondition: "expected-status not received").
fn default_expected_status() -> u16 {
    200
}

/// The closed alphabet of classification rules (§4.4).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "rule")]
pub enum DecisionRule {
    /// `present` iff `status == expected` and `final_url` does not land on
    /// a known error page pattern.
    StatusExists { expected: u16 },
    /// `present` iff `status == expected_status` and the body contains
    /// none of `markers` (case-insensitive); a status mismatch (e.g. a WAF
    /// returning 403 with an empty body) is `indeterminate`, not `present`.
    ContentAbsent {
        markers: Vec<String>,
        #[serde(default = "default_expected_status")]
        expected_status: u16,
    },
    /// `present` iff `status == expected_status` and the body contains at
    /// least one of `markers` (case-insensitive).
    ContentPresent {
        markers: Vec<String>,
        #[serde(default = "default_expected_status")]
        expected_status: u16,
    },
    /// `present` iff `status == expected_status` and the JSON body's
    /// pointer equals `expected`.
    JsonFieldEquals {
        pointer: String,
        expected: serde_json::Value,
        #[serde(default = "default_expected_status")]
        expected_status: u16,
    },
    /// `present` iff `status == expected_status` and the JSON body's
    /// pointer exists and is truthy.
    JsonFieldTruthy {
        pointer: String,
        #[serde(default = "default_expected_status")]
        expected_status: u16,
    },
    /// `present` iff `status == expected_status` and the JSON field is
    /// absent, or equals one of `absent_values`.
    JsonFieldAbsent {
        pointer: String,
        absent_values: Vec<serde_json::Value>,
        #[serde(default = "default_expected_status")]
        expected_status: u16,
    },
}

/// A diagnostic string describing why an outcome is `indeterminate` or
/// `error`. Always short, always free of the raw response body.
pub type Diagnostic = Option<String>;

/// Apply a probe's decision rule to a response. Pure: given the same
/// `rule` and `input`, the result is identical on every platform and run
/// (§4.4, testable property #2).
pub fn classify(rule: &DecisionRule, input: &ClassifierInput<'_>) -> (ProbeState, Diagnostic) {
    match rule {
        DecisionRule::StatusExists { expected } => classify_status_exists(*expected, input),
        DecisionRule::ContentAbsent { markers, expected_status } => {
            precondition_or(*expected_status, input, || classify_content_absent(markers, input))
        }
        DecisionRule::ContentPresent { markers, expected_status } => {
            precondition_or(*expected_status, input, || classify_content_present(markers, input))
        }
        DecisionRule::JsonFieldEquals { pointer, expected, expected_status } => {
            precondition_or(*expected_status, input, || classify_json_field_equals(pointer, expected, input))
        }
        DecisionRule::JsonFieldTruthy { pointer, expected_status } => {
            precondition_or(*expected_status, input, || classify_json_field_truthy(pointer, input))
        }
        DecisionRule::JsonFieldAbsent {
            pointer,
            absent_values,
            expected_status,
        } => precondition_or(*expected_status, input, || {
            classify_json_field_absent(pointer, absent_values, input)
        }),
    }
}

/// Shared precondition for every body/JSON-inspecting rule (§4.4): if the
/// response never reached `expected_status`, the body can't be trusted to
/// mean what the rule thinks it means, so the outcome is `indeterminate`
/// rather than whatever the body happens to contain.
fn precondition_or(
    expected_status: u16,
    input: &ClassifierInput<'_>,
    classify: impl FnOnce() -> (ProbeState, Diagnostic),
) -> (ProbeState, Diagnostic) {
    if input.status != expected_status {
        return (
            ProbeState::Indeterminate,
            Some(format!("expected status {expected_status}, got {}", input.status)),
        );
    }
    classify()
}

fn looks_like_error_redirect(final_url: &str) -> bool {
    let lower = final_url.to_ascii_lowercase();
    REDIRECTED_TO_ERROR_PATTERNS
        .iter()
        .any(|pat| lower.contains(pat))
}

fn classify_status_exists(expected: u16, input: &ClassifierInput<'_>) -> (ProbeState, Diagnostic) {
    if input.status == expected && !looks_like_error_redirect(input.final_url) {
        (ProbeState::Present, None)
    } else if input.status == expected {
        (
            ProbeState::Absent,
            Some(format!("redirected to error page: {}", input.final_url)),
        )
    } else {
        (
            ProbeState::Absent,
            Some(format!("status {} != expected {}", input.status, expected)),
        )
    }
}

fn body_lower(body: &[u8]) -> Option<String> {
    std::str::from_utf8(body).ok().map(|s| s.to_lowercase())
}

fn classify_content_absent(
    markers: &[String],
    input: &ClassifierInput<'_>,
) -> (ProbeState, Diagnostic) {
    let Some(text) = body_lower(input.body) else {
        return (
            ProbeState::Indeterminate,
            Some("response body is not valid UTF-8".to_string()),
        );
    };
    let hit = markers.iter().find(|m| text.contains(&m.to_lowercase()));
    match hit {
        Some(m) => (ProbeState::Absent, Some(format!("matched marker: {m}"))),
        None => (ProbeState::Present, None),
    }
}

fn classify_content_present(
    markers: &[String],
    input: &ClassifierInput<'_>,
) -> (ProbeState, Diagnostic) {
    let Some(text) = body_lower(input.body) else {
        return (
            ProbeState::Indeterminate,
            Some("response body is not valid UTF-8".to_string()),
        );
    };
    let hit = markers.iter().find(|m| text.contains(&m.to_lowercase()));
    match hit {
        Some(_) => (ProbeState::Present, None),
        None => (ProbeState::Absent, Some("no marker matched".to_string())),
    }
}

fn parse_json(body: &[u8]) -> Result<serde_json::Value, String> {
    serde_json::from_slice(body).map_err(|e| format!("invalid json: {e}"))
}

fn classify_json_field_equals(
    pointer: &str,
    expected: &serde_json::Value,
    input: &ClassifierInput<'_>,
) -> (ProbeState, Diagnostic) {
    match parse_json(input.body) {
        Ok(value) => match value.pointer(pointer) {
            Some(found) if found == expected => (ProbeState::Present, None),
            Some(found) => (
                ProbeState::Absent,
                Some(format!("field {pointer} = {found}, expected {expected}")),
            ),
            None => (
                ProbeState::Absent,
                Some(format!("field {pointer} absent")),
            ),
        },
        Err(e) => (ProbeState::Indeterminate, Some(e)),
    }
}

fn classify_json_field_truthy(
    pointer: &str,
    input: &ClassifierInput<'_>,
) -> (ProbeState, Diagnostic) {
    match parse_json(input.body) {
        Ok(value) => match value.pointer(pointer) {
            Some(found) if is_truthy(found) => (ProbeState::Present, None),
            Some(found) => (
                ProbeState::Absent,
                Some(format!("field {pointer} = {found} is not truthy")),
            ),
            None => (
                ProbeState::Absent,
                Some(format!("field {pointer} absent")),
            ),
        },
        Err(e) => (ProbeState::Indeterminate, Some(e)),
    }
}

fn classify_json_field_absent(
    pointer: &str,
    absent_values: &[serde_json::Value],
    input: &ClassifierInput<'_>,
) -> (ProbeState, Diagnostic) {
    match parse_json(input.body) {
        Ok(value) => match value.pointer(pointer) {
            None => (ProbeState::Present, None),
            Some(found) if absent_values.iter().any(|v| v == found) => (ProbeState::Present, None),
            Some(found) => (
                ProbeState::Absent,
                Some(format!("field {pointer} = {found}")),
            ),
        },
        Err(e) => (ProbeState::Indeterminate, Some(e)),
    }
}

fn is_truthy(v: &serde_json::Value) -> bool {
    match v {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}
